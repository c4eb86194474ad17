//! Lookup tables over the descriptor graph.
//!
//! The [`SymbolTable`] maps fully-qualified type names to their descriptors
//! across every file of the request, and [`SourceIndex`] resolves
//! SourceCodeInfo paths to locations and comments.

use std::collections::HashMap;

use crate::diagnostic::SourceLocation;
use super::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

// Field numbers used in SourceCodeInfo paths.
pub const FILE_MESSAGE_TYPE: i32 = 4;
pub const FILE_ENUM_TYPE: i32 = 5;
pub const FILE_SERVICE: i32 = 6;
pub const MESSAGE_FIELD: i32 = 2;
pub const MESSAGE_NESTED_TYPE: i32 = 3;
pub const MESSAGE_ENUM_TYPE: i32 = 4;
pub const MESSAGE_OPTIONS: i32 = 7;
pub const SERVICE_METHOD: i32 = 2;
pub const SERVICE_OPTIONS: i32 = 3;
pub const METHOD_OPTIONS: i32 = 4;

/// A named type found in the descriptor graph.
#[derive(Debug, Clone, Copy)]
pub enum TypeDef<'a> {
    Message(&'a DescriptorProto),
    Enum(&'a EnumDescriptorProto),
}

/// A type plus where it was declared.
#[derive(Debug, Clone)]
pub struct TypeEntry<'a> {
    pub def: TypeDef<'a>,
    pub file: &'a FileDescriptorProto,
    /// Package of the declaring file (may be empty).
    pub package: String,
    /// SourceCodeInfo path of the declaration.
    pub path: Vec<i32>,
}

/// Fully-qualified name (no leading dot) → type declaration.
#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    types: HashMap<String, TypeEntry<'a>>,
}

impl<'a> SymbolTable<'a> {
    /// Indexes every message and enum, nested ones included.
    pub fn build(files: &'a [FileDescriptorProto]) -> Self {
        let mut table = Self::default();
        for file in files {
            let package = file.package().to_string();
            for (i, message) in file.message_type.iter().enumerate() {
                table.add_message(file, &package, &package, message, vec![FILE_MESSAGE_TYPE, i as i32]);
            }
            for (i, enumeration) in file.enum_type.iter().enumerate() {
                let full_name = qualify(&package, enumeration.name());
                table.types.insert(
                    full_name,
                    TypeEntry {
                        def: TypeDef::Enum(enumeration),
                        file,
                        package: package.clone(),
                        path: vec![FILE_ENUM_TYPE, i as i32],
                    },
                );
            }
        }
        table
    }

    fn add_message(
        &mut self,
        file: &'a FileDescriptorProto,
        package: &str,
        scope: &str,
        message: &'a DescriptorProto,
        path: Vec<i32>,
    ) {
        let full_name = qualify(scope, message.name());

        for (i, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([MESSAGE_NESTED_TYPE, i as i32]);
            self.add_message(file, package, &full_name, nested, nested_path);
        }
        for (i, enumeration) in message.enum_type.iter().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([MESSAGE_ENUM_TYPE, i as i32]);
            self.types.insert(
                qualify(&full_name, enumeration.name()),
                TypeEntry {
                    def: TypeDef::Enum(enumeration),
                    file,
                    package: package.to_string(),
                    path: enum_path,
                },
            );
        }

        self.types.insert(
            full_name,
            TypeEntry {
                def: TypeDef::Message(message),
                file,
                package: package.to_string(),
                path,
            },
        );
    }

    pub fn get(&self, full_name: &str) -> Option<&TypeEntry<'a>> {
        self.types.get(full_name)
    }

    /// Resolves a type name as written in a descriptor.
    ///
    /// Names with a leading dot are absolute. Anything else is looked up
    /// from `scope` outwards, the way protoc resolves relative names.
    pub fn resolve(&self, type_name: &str, scope: &str) -> Option<String> {
        if let Some(absolute) = type_name.strip_prefix('.') {
            return self.types.contains_key(absolute).then(|| absolute.to_string());
        }

        let mut scope = scope;
        loop {
            let candidate = qualify(scope, type_name);
            if self.types.contains_key(&candidate) {
                return Some(candidate);
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rfind('.').map(|i| &scope[..i]).unwrap_or("");
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Joins a scope and a simple name.
pub fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

#[derive(Debug, Clone)]
struct SpanInfo {
    line: u32,
    column: u32,
    leading_comments: Option<String>,
}

/// SourceCodeInfo of one file, keyed by path.
#[derive(Debug)]
pub struct SourceIndex {
    file: String,
    spans: HashMap<Vec<i32>, SpanInfo>,
}

impl SourceIndex {
    pub fn new(file: &FileDescriptorProto) -> Self {
        let mut spans = HashMap::new();
        if let Some(info) = &file.source_code_info {
            for location in &info.location {
                // span is [start_line, start_col, (end_line,) end_col], 0-based
                if location.span.len() < 3 {
                    continue;
                }
                spans.entry(location.path.clone()).or_insert_with(|| SpanInfo {
                    line: location.span[0].max(0) as u32 + 1,
                    column: location.span[1].max(0) as u32 + 1,
                    leading_comments: location.leading_comments.clone(),
                });
            }
        }
        Self {
            file: file.name().to_string(),
            spans,
        }
    }

    /// Location of the declaration at `path`.
    pub fn location(&self, path: &[i32], declaration: &str) -> SourceLocation {
        let location = SourceLocation::new(&self.file, declaration);
        match self.spans.get(path) {
            Some(span) => location.with_position(span.line, span.column),
            None => location,
        }
    }

    /// Location of the option at `path`, falling back to its declaration.
    pub fn option_location(&self, option_path: &[i32], declaration_path: &[i32], declaration: &str) -> SourceLocation {
        if self.spans.contains_key(option_path) {
            self.location(option_path, declaration)
        } else {
            self.location(declaration_path, declaration)
        }
    }

    /// Leading comment of the declaration, trimmed of surrounding blank lines.
    pub fn comments(&self, path: &[i32]) -> Option<String> {
        let text = self.spans.get(path)?.leading_comments.as_deref()?;
        let lines: Vec<&str> = text.lines().map(|l| l.strip_prefix(' ').unwrap_or(l).trim_end()).collect();
        let joined = lines.join("\n").trim_matches('\n').to_string();
        (!joined.is_empty()).then_some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{source_code_info::Location, SourceCodeInfo};

    fn message(name: &str, nested: Vec<DescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            nested_type: nested,
            ..Default::default()
        }
    }

    fn file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("shop/orders.proto".to_string()),
            package: Some("shop.v1".to_string()),
            message_type: vec![message("Order", vec![message("Line", vec![])]), message("Line", vec![])],
            enum_type: vec![EnumDescriptorProto {
                name: Some("Status".to_string()),
                value: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_indexes_nested_types() {
        let files = vec![file()];
        let table = SymbolTable::build(&files);

        assert!(table.get("shop.v1.Order").is_some());
        assert!(table.get("shop.v1.Order.Line").is_some());
        assert!(matches!(table.get("shop.v1.Status").map(|e| e.def), Some(TypeDef::Enum(_))));
        assert_eq!(table.get("shop.v1.Order.Line").map(|e| e.path.clone()), Some(vec![4, 0, 3, 0]));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_relative_resolution_prefers_innermost_scope() {
        let files = vec![file()];
        let table = SymbolTable::build(&files);

        assert_eq!(table.resolve("Line", "shop.v1.Order").as_deref(), Some("shop.v1.Order.Line"));
        assert_eq!(table.resolve("Line", "shop.v1").as_deref(), Some("shop.v1.Line"));
        assert_eq!(table.resolve(".shop.v1.Line", "anything").as_deref(), Some("shop.v1.Line"));
        assert_eq!(table.resolve("Missing", "shop.v1.Order"), None);
    }

    #[test]
    fn test_source_index_positions_and_comments() {
        let mut f = file();
        f.source_code_info = Some(SourceCodeInfo {
            location: vec![Location {
                path: vec![4, 0],
                span: vec![9, 0, 14, 1],
                leading_comments: Some(" An order.\n Placed by a customer.\n".to_string()),
                trailing_comments: None,
            }],
        });
        let index = SourceIndex::new(&f);

        let loc = index.location(&[4, 0], "shop.v1.Order");
        assert_eq!(loc.to_string(), "shop/orders.proto:10:1");
        assert_eq!(index.comments(&[4, 0]).as_deref(), Some("An order.\nPlaced by a customer."));
        assert_eq!(index.location(&[4, 1], "shop.v1.Line").line, None);
    }
}
