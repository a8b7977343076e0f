//! An owned model of an executable GraphQL document.
//!
//! Parsing is done by `cynic-parser`.  The parsed document borrows from the
//! source text and is awkward to keep around for the lifetime of an operation,
//! so we lower it into the types in this module.  Documents are immutable once
//! built and are shared behind an `Arc` by the exchange.

mod directives;
mod lower;
mod print;
mod typenames;
mod variables;

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

pub use self::variables::Variables;
pub(crate) use self::{
    directives::should_include,
    variables::{normalize_variables, resolve_arguments},
};
use crate::error::DocumentError;

/// A parsed executable document: at most one operation plus its fragments.
///
/// Documents that only contain fragments are valid, they are what
/// `read_fragment`/`write_fragment` consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) operation: Option<OperationDefinition>,
    pub(crate) fragments: Fragments,
    hash: DocumentHash,
}

pub(crate) type Fragments = IndexMap<String, FragmentDefinition>;

/// A stable hash of a documents printed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHash([u8; 32]);

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    pub operation_type: OperationType,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    /// The printed type of the variable, e.g. `[ID!]!`
    pub ty: String,
    pub default_value: Option<InputValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

pub type SelectionSet = Vec<Selection>;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    FragmentSpread(FragmentSpread),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

impl Field {
    /// The key this field is found under in a response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Whether this field selects sub-fields, i.e. whether its value is a link
    pub fn is_composite(&self) -> bool {
        !self.selection_set.is_empty()
    }

    pub(crate) fn leaf(name: &str) -> Self {
        Field {
            alias: None,
            name: name.to_string(),
            arguments: vec![],
            directives: vec![],
            selection_set: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub fragment_name: String,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: InputValue,
}

/// A literal input value as written in a document
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl Document {
    /// Parses an executable document.
    ///
    /// Only the first operation in the document is kept, matching how a
    /// single request is executed.
    pub fn parse(source: &str) -> Result<Document, DocumentError> {
        let parsed = cynic_parser::parse_executable_document(source)
            .map_err(|error| DocumentError::Parse(error.to_string()))?;

        lower::lower_document(&parsed)
    }

    pub(crate) fn new(operation: Option<OperationDefinition>, fragments: Fragments) -> Result<Self, DocumentError> {
        if operation.is_none() && fragments.is_empty() {
            return Err(DocumentError::Empty);
        }

        let mut document = Document {
            operation,
            fragments,
            hash: DocumentHash([0; 32]),
        };
        document.hash = DocumentHash(*blake3::hash(document.to_string().as_bytes()).as_bytes());

        Ok(document)
    }

    pub fn hash(&self) -> DocumentHash {
        self.hash
    }

    pub fn operation(&self) -> Option<&OperationDefinition> {
        self.operation.as_ref()
    }

    pub fn operation_type(&self) -> Option<OperationType> {
        self.operation.as_ref().map(|operation| operation.operation_type)
    }

    pub(crate) fn main_operation(&self) -> Result<&OperationDefinition, DocumentError> {
        self.operation.as_ref().ok_or(DocumentError::NoOperation)
    }

    pub fn fragment(&self, name: &str) -> Option<&FragmentDefinition> {
        self.fragments.get(name)
    }

    /// The fragment that `read_fragment`/`write_fragment` use: the named one,
    /// or the first one in the document.
    pub(crate) fn select_fragment(&self, name: Option<&str>) -> Result<&FragmentDefinition, DocumentError> {
        match name {
            Some(name) => self
                .fragments
                .get(name)
                .ok_or_else(|| DocumentError::UnknownFragment(name.to_string())),
            None => self.fragments.values().next().ok_or(DocumentError::NoFragment),
        }
    }

    /// Returns a copy of this document with `__typename` selected in every
    /// selection set that has sub-fields.
    pub fn with_typenames(&self) -> Result<Document, DocumentError> {
        let mut operation = self.operation.clone();
        if let Some(operation) = &mut operation {
            typenames::add_typenames(&mut operation.selection_set, false);
        }

        let mut fragments = self.fragments.clone();
        for fragment in fragments.values_mut() {
            typenames::add_typenames(&mut fragment.selection_set, true);
        }

        Document::new(operation, fragments)
    }
}

/// A document shared between operations
pub type SharedDocument = Arc<Document>;

#[cfg(test)]
mod tests;
