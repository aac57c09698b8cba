//! Response helpers: plain JSON bodies, no envelope.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

/// `{"message": "<label> <action> successfully"}`.
pub fn message(label: &str, action: &str) -> MessageBody {
    MessageBody {
        message: format!("{} {} successfully", label, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wording() {
        assert_eq!(message("User", "created").message, "User created successfully");
        assert_eq!(
            serde_json::to_value(message("Post", "deleted")).unwrap(),
            serde_json::json!({"message": "Post deleted successfully"})
        );
    }
}
