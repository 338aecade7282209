//! Response builders for a mocked chat-completions gateway.

use serde_json::{json, Value};

/// A minimal successful chat-completions response with the given content.
pub fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 0,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// A completion whose content is a serialized JSON object/array, as the
/// JSON-mode calls return it.
pub fn json_completion(value: &Value) -> Value {
    completion(&value.to_string())
}

/// A receipt-extraction result in the shape the upload prompt asks for.
pub fn receipt_completion(amount_cents: i64, description: &str, category: &str, roast: &str) -> Value {
    json_completion(&json!({
        "amount": amount_cents,
        "description": description,
        "date": "2024-03-15T12:00:00Z",
        "category": category,
        "roast": roast,
    }))
}

/// A gateway-side error body.
pub fn error_body(message: &str) -> Value {
    json!({ "error": { "message": message } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_shape_matches_client_expectations() {
        let value = completion("hello");
        assert_eq!(value["choices"][0]["message"]["content"], "hello");
    }

    #[test]
    fn test_receipt_completion_is_stringified_json() {
        let value = receipt_completion(650, "Starbucks", "Food & Drink", "r");
        let content = value["choices"][0]["message"]["content"].as_str().unwrap();
        let inner: Value = serde_json::from_str(content).unwrap();
        assert_eq!(inner["amount"], 650);
    }
}
