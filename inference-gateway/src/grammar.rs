//! GBNF grammar forcing the extraction backend to emit exactly the
//! six-field JSON object the dialogue engine consumes. llama.cpp
//! applies it server-side via the `grammar` request field, so the
//! response needs no fence stripping or repair.

pub const EXTRACTION_GRAMMAR: &str = r#"
root ::= "{" ws object "}"
object ::=
  "\"age\":" ws string-or-null "," ws
  "\"gender\":" ws string-or-null "," ws
  "\"symptoms\":" ws string-list "," ws
  "\"is_self\":" ws boolean "," ws
  "\"history\":" ws string-or-null "," ws
  "\"special_note\":" ws string-or-null
string ::= "\"" ([^"\\] | "\\" (["\\/bfnrt] | "u" [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F]))* "\""
string-list ::= "[" ws (string ("," ws string)*)? ws "]"
boolean ::= "true" | "false"
string-or-null ::= string | "null"
ws ::= [ \t\n]*
"#;
