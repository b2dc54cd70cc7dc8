// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatTab {
    Chat,
    Agricultura,
    Pesca,
    Paa,
    Sim,
}

impl ChatTab {
    pub const ALL: [Self; 5] = [
        Self::Chat,
        Self::Agricultura,
        Self::Pesca,
        Self::Paa,
        Self::Sim,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Agricultura => "agricultura",
            Self::Pesca => "pesca",
            Self::Paa => "paa",
            Self::Sim => "sim",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(Self::Chat),
            "agricultura" => Some(Self::Agricultura),
            "pesca" => Some(Self::Pesca),
            "paa" => Some(Self::Paa),
            "sim" => Some(Self::Sim),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Chat => "geral",
            Self::Agricultura => "agricultura",
            Self::Pesca => "pesca",
            Self::Paa => "PAA",
            Self::Sim => "SIM",
        }
    }

    pub const fn greeting(self) -> &'static str {
        match self {
            Self::Chat => "Olá! Como posso ajudar você hoje?",
            Self::Agricultura => "Pergunte sobre assistência técnica e cadastro rural.",
            Self::Pesca => "Pergunte sobre licenças e apoio ao pescador.",
            Self::Paa => "Programa de Aquisição de Alimentos: inscrição e entregas.",
            Self::Sim => "Serviço de Inspeção Municipal: registro e vistorias.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    Home,
    Agricultura,
    Pesca,
    Paa,
    Sim,
}

impl PageKind {
    pub const ALL: [Self; 5] = [
        Self::Home,
        Self::Agricultura,
        Self::Pesca,
        Self::Paa,
        Self::Sim,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Agricultura => "agricultura",
            Self::Pesca => "pesca",
            Self::Paa => "paa",
            Self::Sim => "sim",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "home" => Some(Self::Home),
            "agricultura" => Some(Self::Agricultura),
            "pesca" => Some(Self::Pesca),
            "paa" => Some(Self::Paa),
            "sim" => Some(Self::Sim),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "início",
            Self::Agricultura => "agricultura",
            Self::Pesca => "pesca",
            Self::Paa => "PAA",
            Self::Sim => "SIM",
        }
    }

    /// Chat tab behind the page's "Abrir Chat" button, if the page has one.
    pub const fn chat_shortcut(self) -> Option<ChatTab> {
        match self {
            Self::Home => None,
            Self::Agricultura => Some(ChatTab::Agricultura),
            Self::Pesca => Some(ChatTab::Pesca),
            Self::Paa => Some(ChatTab::Paa),
            Self::Sim => Some(ChatTab::Sim),
        }
    }

    pub const fn summary(self) -> &'static str {
        match self {
            Self::Home => "Secretaria de Agricultura, Pesca e Abastecimento.",
            Self::Agricultura => "Assistência técnica, mecanização e cadastro de produtores.",
            Self::Pesca => "Apoio à pesca artesanal e à aquicultura.",
            Self::Paa => "Compra pública de alimentos da agricultura familiar.",
            Self::Sim => "Inspeção sanitária de produtos de origem animal.",
        }
    }
}
