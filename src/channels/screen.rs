use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ButtonAction {
    Token(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn token(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Token(token.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Text plus inline keyboard, independent of any chat platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Screen {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.keyboard.push(buttons);
        }
        self
    }

    pub fn button(self, label: impl Into<String>, token: impl Into<String>) -> Self {
        self.row(vec![Button::token(label, token)])
    }

    /// Prepends an inline error line, used when re-prompting after bad input.
    pub fn with_error(mut self, error: &str) -> Self {
        self.text = format!("⚠️ {error}\n\n{}", self.text);
        self
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.action {
                ButtonAction::Token(token) => Some(token.as_str()),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens().contains(&token)
    }
}
