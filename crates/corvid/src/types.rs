//! The static type hierarchy and the assignability relation that drives
//! semantic analysis.

use std::fmt;

/// A structural type: either a named base type, a homogeneous list, or a
/// fixed-arity tuple of (possibly differing) element types. Equality is
/// structural, matching the source language's own `Type.__eq__`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Base(String),
    List(Box<Type>),
    Tuple(Vec<Type>),
}

impl Type {
    pub fn base(name: impl Into<String>) -> Self {
        Type::Base(name.into())
    }

    pub fn nil() -> Self {
        Type::Base("nil".to_string())
    }

    pub fn void() -> Self {
        Type::Base("void".to_string())
    }

    pub fn bool() -> Self {
        Type::Base("bool".to_string())
    }

    pub fn int() -> Self {
        Type::Base("int".to_string())
    }

    pub fn float() -> Self {
        Type::Base("float".to_string())
    }

    pub fn str() -> Self {
        Type::Base("str".to_string())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Base(n) if n == "void" || n == "nil")
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Base(n) if n == "int" || n == "float")
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Base(n) if n == "bool")
    }

    /// `char` is a recognized base type name but is treated everywhere as a
    /// synonym for a single-element `str`.
    pub fn is_char_or_str(&self) -> bool {
        matches!(self, Type::Base(n) if n == "str" || n == "char")
    }

    /// Whether a value of type `self` may be used where `target` is expected:
    /// identity, `int` widening to `float`, and recursive element-wise
    /// acceptance for lists and tuples.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Base(a), Type::Base(b)) if a == "int" && b == "float" => true,
            (Type::List(a), Type::List(b)) => a.is_assignable_to(b),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_assignable_to(y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Base(name) => f.write_str(name),
            Type::List(elem) => write!(f, "list<{elem}>"),
            Type::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(|e| e.to_string()).collect();
                write!(f, "tuple<{}>", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_widens_to_float() {
        assert!(Type::int().is_assignable_to(&Type::float()));
        assert!(!Type::float().is_assignable_to(&Type::int()));
    }

    #[test]
    fn identity_is_always_assignable() {
        let t = Type::List(Box::new(Type::str()));
        assert!(t.is_assignable_to(&t));
    }

    #[test]
    fn list_element_widening_is_recursive() {
        let ints = Type::List(Box::new(Type::int()));
        let floats = Type::List(Box::new(Type::float()));
        assert!(ints.is_assignable_to(&floats));
        assert!(!floats.is_assignable_to(&ints));
    }

    #[test]
    fn tuple_requires_same_arity() {
        let a = Type::Tuple(vec![Type::int(), Type::str()]);
        let b = Type::Tuple(vec![Type::int()]);
        assert!(!a.is_assignable_to(&b));
    }

    #[test]
    fn tuple_elements_widen_positionally() {
        let a = Type::Tuple(vec![Type::int(), Type::int()]);
        let b = Type::Tuple(vec![Type::float(), Type::int()]);
        assert!(a.is_assignable_to(&b));
        assert!(!b.is_assignable_to(&a));
    }

    #[test]
    fn display_matches_source_spelling() {
        let t = Type::Tuple(vec![Type::int(), Type::List(Box::new(Type::str()))]);
        assert_eq!(t.to_string(), "tuple<int, list<str>>");
    }
}
