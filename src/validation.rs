use std::collections::BTreeMap;

use serde::Serialize;

/// A validated movie attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    Title,
    DirectorId,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::DirectorId => "director_id",
        }
    }

    /// Name used when rendering a full message, with any `_id` suffix dropped.
    pub fn human_name(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::DirectorId => "Director",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} can't be blank", .0.human_name())]
    MissingRequiredField(Field),
    #[error("{} has already been taken", .0.human_name())]
    DuplicateValue(Field),
}

impl ValidationError {
    pub fn field(self) -> Field {
        match self {
            ValidationError::MissingRequiredField(field) | ValidationError::DuplicateValue(field) => {
                field
            },
        }
    }

    /// The message without the field name.
    pub fn message(self) -> &'static str {
        match self {
            ValidationError::MissingRequiredField(_) => "can't be blank",
            ValidationError::DuplicateValue(_) => "has already been taken",
        }
    }
}

/// Validation failures collected on one instance, in the order the rules ran.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Errors(Vec<ValidationError>);

impl Errors {
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, error: ValidationError) -> bool {
        self.0.contains(&error)
    }

    pub fn on(&self, field: Field) -> Vec<ValidationError> {
        self.0.iter().copied().filter(|e| e.field() == field).collect()
    }

    pub fn messages(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut out: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
        for error in &self.0 {
            out.entry(error.field().as_str()).or_default().push(error.message());
        }
        out
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Serialize for Errors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.messages().serialize(serializer)
    }
}

pub type ValidationResult = Result<(), Errors>;

/// A check run against a candidate row before it is written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rule {
    /// The field must hold a non-blank value.
    Presence(Field),
    /// No other persisted row may hold the same non-blank value.
    Uniqueness(Field),
}

pub const MOVIE_RULES: &[Rule] =
    &[Rule::Presence(Field::DirectorId), Rule::Uniqueness(Field::Title)];
