use serde::{Deserialize, Serialize};

/// The JSON wrapper around every API response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,
    // `default` would add a `T: Default` bound to Deserialize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            count: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            count: Some(count),
            ..Self::data(items)
        }
    }
}

impl Envelope<()> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            count: None,
        }
    }
}

/// Body returned for requests that match no route.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RouteNotFound {
    pub success: bool,
    pub error: String,
    pub path: String,
    pub method: String,
}
