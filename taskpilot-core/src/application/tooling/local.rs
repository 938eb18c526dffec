//! In-memory author records served without a round-trip to the tool server.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct Author {
    name: String,
    bio: String,
    birth_year: Option<Value>,
    nationality: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Author store owned by one tool client. Failures are reported as
/// `{"error": ...}` payloads, the same shape a server-side tool would return.
#[derive(Default)]
pub struct AuthorStore {
    authors: Mutex<Vec<Author>>,
}

impl AuthorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, tool: &str, input: &Value) -> Value {
        debug!(tool, "Handling author tool locally");
        let name = input.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());

        match tool {
            "get_authors" => {
                let authors = self.lock();
                json!({
                    "success": true,
                    "authors": to_json(&*authors),
                    "count": authors.len(),
                })
            }
            "add_author" => match name {
                Some(name) => self.add(name, input),
                None => name_required(),
            },
            "get_author_by_name" => match name {
                Some(name) => {
                    let authors = self.lock();
                    match authors.iter().find(|a| a.name == name) {
                        Some(author) => json!({"success": true, "author": to_json(author)}),
                        None => not_found(name),
                    }
                }
                None => name_required(),
            },
            "update_author" => match name {
                Some(name) => self.update(name, input),
                None => name_required(),
            },
            "delete_author" => match name {
                Some(name) => {
                    let mut authors = self.lock();
                    match authors.iter().position(|a| a.name == name) {
                        Some(index) => {
                            let deleted = authors.remove(index);
                            json!({
                                "success": true,
                                "message": format!("Author '{name}' has been successfully deleted"),
                                "deleted_author": to_json(&deleted),
                            })
                        }
                        None => not_found(name),
                    }
                }
                None => name_required(),
            },
            other => json!({"error": format!("Unknown author tool: {other}")}),
        }
    }

    fn add(&self, name: &str, input: &Value) -> Value {
        let mut authors = self.lock();
        if authors.iter().any(|a| a.name == name) {
            return json!({"error": format!("Author '{name}' already exists")});
        }
        let author = Author {
            name: name.to_string(),
            bio: text_field(input, "bio"),
            birth_year: input.get("birth_year").filter(|v| !v.is_null()).cloned(),
            nationality: text_field(input, "nationality"),
            created_at: Utc::now(),
            updated_at: None,
        };
        let payload = json!({
            "success": true,
            "message": format!("Author '{name}' has been successfully added to the system"),
            "author": to_json(&author),
        });
        authors.push(author);
        payload
    }

    fn update(&self, name: &str, input: &Value) -> Value {
        let mut authors = self.lock();
        let Some(author) = authors.iter_mut().find(|a| a.name == name) else {
            return not_found(name);
        };
        if let Some(new_name) = input.get("new_name").and_then(Value::as_str) {
            author.name = new_name.to_string();
        }
        if let Some(bio) = input.get("bio").and_then(Value::as_str) {
            author.bio = bio.to_string();
        }
        if let Some(year) = input.get("birth_year") {
            author.birth_year = Some(year.clone()).filter(|v| !v.is_null());
        }
        if let Some(nationality) = input.get("nationality").and_then(Value::as_str) {
            author.nationality = nationality.to_string();
        }
        author.updated_at = Some(Utc::now());
        json!({
            "success": true,
            "message": format!("Author '{name}' has been successfully updated"),
            "author": to_json(&*author),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Author>> {
        self.authors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn text_field(input: &Value, key: &str) -> String {
    input
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn name_required() -> Value {
    json!({"error": "Author name is required"})
}

fn not_found(name: &str) -> Value {
    json!({"error": format!("Author '{name}' not found")})
}
