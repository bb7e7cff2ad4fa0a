use super::Value;

/// A single `(name, value)` pair bound to a command.
///
/// The name is empty for positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn positional(value: impl Into<Value>) -> Self {
        Self::new(String::new(), value)
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Ordered list of parameters. Names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new(v: Vec<Parameter>) -> Self {
        Self(v)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn push(&mut self, p: Parameter) {
        self.0.push(p);
    }

    /// First parameter with the given name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    pub fn has_entities(&self) -> bool {
        self.0.iter().any(|p| p.value.is_entity())
    }

    /// Replaces every [`Value::Entity`] parameter, in place, with one parameter per
    /// entity field. Nested entities are expanded recursively.
    ///
    /// Fields of a named entity are named after the field. Fields of a positional entity
    /// stay positional, in field order, so that a positional-only call never turns into
    /// a mix of named and positional parameters.
    pub fn expand_entities(self) -> Self {
        let mut out = Vec::with_capacity(self.0.len());
        for p in self.0 {
            expand_into(p, &mut out);
        }
        Self(out)
    }

    pub fn into_inner(self) -> Vec<Parameter> {
        self.0
    }
}

fn expand_into(p: Parameter, out: &mut Vec<Parameter>) {
    let named = p.is_named();
    match p.value {
        Value::Entity(entity) => {
            for (name, value) in entity.into_fields() {
                let field = if named {
                    Parameter { name, value }
                } else {
                    Parameter::positional(value)
                };
                expand_into(field, out);
            }
        }
        _ => out.push(p),
    }
}

impl From<Vec<Parameter>> for Parameters {
    fn from(v: Vec<Parameter>) -> Self {
        Self(v)
    }
}

impl IntoIterator for Parameters {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;

    #[test]
    fn expand_entities_in_place() {
        let user = Entity::new()
            .with_field("user_id", 12)
            .with_field("address", Entity::new().with_field("city", "Turin"));

        let params = Parameters::new(vec![
            Parameter::positional(1),
            Parameter::new("user", user),
            Parameter::new("flag", true),
        ])
        .expand_entities();

        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["", "user_id", "city", "flag"]);
        assert_eq!(params.get("CITY"), Some(&Value::Text("Turin".into())));
        assert!(!params.has_entities());
    }

    #[test]
    fn positional_entities_expand_to_positional_values() {
        let user = Entity::new()
            .with_field("user_id", 12)
            .with_field("address", Entity::new().with_field("city", "Turin"));

        let params = Parameters::new(vec![Parameter::positional(user), Parameter::positional(5)])
            .expand_entities();

        assert!(params.iter().all(|p| !p.is_named()));
        let values: Vec<&Value> = params.iter().map(|p| &p.value).collect();
        assert_eq!(
            values,
            vec![&Value::Integer(12), &Value::Text("Turin".into()), &Value::Integer(5)]
        );
    }

    #[test]
    fn expand_without_entities_is_identity() {
        let params = Parameters::new(vec![Parameter::new("a", 1), Parameter::positional("b")]);
        assert_eq!(params.clone().expand_entities(), params);
    }
}
