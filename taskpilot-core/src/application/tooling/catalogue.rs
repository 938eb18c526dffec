//! Fixed tool surface the planner can rely on regardless of what the server
//! reports, plus the alias and parameter remapping tables applied before
//! dispatch.

use serde_json::Value;

use crate::domain::{FieldSpec, FieldType, InputSchema, ToolDescriptor};

/// Alias name → name the server actually implements.
const TOOL_ALIASES: &[(&str, &str)] = &[
    ("get_book_by_id", "get_book_details"),
    ("create_book", "add_book"),
];

/// (tool, parameter as called, parameter the server expects)
const PARAM_RENAMES: &[(&str, &str, &str)] = &[("get_book_by_id", "id", "book_id")];

/// Tools answered from the client's in-memory author store.
pub const LOCAL_AUTHOR_TOOLS: &[&str] = &[
    "add_author",
    "get_authors",
    "get_author_by_name",
    "update_author",
    "delete_author",
];

/// Tools whose output is passed in full to the final-answer prompt so the
/// model can count and aggregate exactly.
const DATA_RETRIEVAL_TOOLS: &[&str] = &["get_all_books", "search_books", "get_book_by_id", "list_books"];

pub fn resolve_alias(name: &str) -> &str {
    TOOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, actual)| *actual)
        .unwrap_or(name)
}

/// Renames parameters for tools whose server-side counterpart expects a
/// different field name. Non-object inputs pass through unchanged.
pub fn remap_arguments(name: &str, input: &Value) -> Value {
    let mut arguments = match input {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => return other.clone(),
    };
    for (tool, from, to) in PARAM_RENAMES {
        if *tool == name {
            if let Some(value) = arguments.remove(*from) {
                arguments.insert((*to).to_string(), value);
            }
        }
    }
    Value::Object(arguments)
}

pub fn is_local_tool(name: &str) -> bool {
    LOCAL_AUTHOR_TOOLS.contains(&name)
}

pub fn is_data_retrieval_tool(name: &str) -> bool {
    DATA_RETRIEVAL_TOOLS.contains(&name)
}

/// Appends every supplemental tool the server did not report under the
/// same name.
pub fn augment(tools: &mut Vec<ToolDescriptor>) {
    for extra in supplemental_tools() {
        if !tools.iter().any(|tool| tool.name == extra.name) {
            tools.push(extra);
        }
    }
}

/// Planner-facing list: `- **name**: description (Required: a, b)`.
pub fn render_catalogue(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "No tools are currently available.".to_string();
    }
    tools
        .iter()
        .map(|tool| {
            let mut line = format!("- **{}**: {}", tool.name, tool.description);
            if !tool.input_schema.required.is_empty() {
                line.push_str(&format!(" (Required: {})", tool.input_schema.required.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool(
    name: &str,
    description: &str,
    fields: &[(&str, FieldType, &str)],
    required: &[&str],
) -> ToolDescriptor {
    let schema = InputSchema {
        required: required.iter().map(|r| r.to_string()).collect(),
        fields: fields
            .iter()
            .map(|(field, field_type, doc)| FieldSpec {
                name: field.to_string(),
                field_type: Some(field_type.clone()),
                description: Some(doc.to_string()),
            })
            .collect(),
    };
    ToolDescriptor::new(name, description, schema)
}

pub fn supplemental_tools() -> Vec<ToolDescriptor> {
    use FieldType::{Integer, String as Text};

    vec![
        tool("get_all_books", "Get all books in the library (alias for list_books)", &[], &[]),
        tool(
            "get_book_by_id",
            "Get a book by its ID (alias for get_book_details)",
            &[("id", Integer, "The ID of the book")],
            &["id"],
        ),
        tool(
            "create_book",
            "Create a new book in the library (alias for add_book)",
            &[
                ("title", Text, "Book title"),
                ("author", Text, "Book author"),
                ("genre", Text, "Book genre"),
                ("isbn", Text, "ISBN number"),
                ("year", Integer, "Publication year"),
            ],
            &["title", "author"],
        ),
        tool(
            "update_book",
            "Update an existing book's information",
            &[
                ("book_id", Integer, "The ID of the book to update"),
                ("title", Text, "Updated book title"),
                ("author", Text, "Updated book author"),
                ("genre", Text, "Updated book genre"),
                ("isbn", Text, "Updated ISBN number"),
                ("year", Integer, "Updated publication year"),
            ],
            &["book_id"],
        ),
        tool(
            "delete_book",
            "Delete a book from the library",
            &[("book_id", Integer, "The ID of the book to delete")],
            &["book_id"],
        ),
        tool("get_book_count", "Get the total number of books in the library", &[], &[]),
        tool(
            "add_author",
            "Add a new author to the system",
            &[
                ("name", Text, "Author's full name"),
                ("bio", Text, "Author's biography (optional)"),
                ("birth_year", Integer, "Author's birth year (optional)"),
                ("nationality", Text, "Author's nationality (optional)"),
            ],
            &["name"],
        ),
        tool("get_authors", "Get all authors in the system", &[], &[]),
        tool(
            "get_author_by_name",
            "Get author details by name",
            &[("name", Text, "Author's name to search for")],
            &["name"],
        ),
        tool(
            "update_author",
            "Update an existing author's information",
            &[
                ("name", Text, "Current author's name"),
                ("new_name", Text, "New author's name (optional)"),
                ("bio", Text, "Updated biography (optional)"),
                ("birth_year", Integer, "Updated birth year (optional)"),
                ("nationality", Text, "Updated nationality (optional)"),
            ],
            &["name"],
        ),
        tool(
            "delete_author",
            "Delete an author from the system",
            &[("name", Text, "Author's name to delete")],
            &["name"],
        ),
    ]
}
