//! RDF term and quad model consumed by the engine
//!
//! The engine treats terms as opaque comparable values: it never parses,
//! coerces, or serializes them beyond what joins, grouping, and aggregates
//! require (structural equality/hashing, a lexical form for GROUP_CONCAT,
//! and numeric access for SUM).

use std::fmt;
use std::sync::Arc;

/// An RDF term - IRI, blank node, or literal (cheap to clone, Arc-backed)
///
/// # Invariants
///
/// - Equality and hashing are structural; two literals are equal iff their
///   lexical form, datatype, and language tag all match.
/// - There is no "unbound" term: absence of a binding is represented by
///   absence from a [`crate::solution::Solution`], never by a sentinel term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// IRI reference
    Iri(Arc<str>),
    /// Blank node with label
    BlankNode(Arc<str>),
    /// Literal with lexical form, datatype IRI, and optional language tag
    Literal {
        /// The lexical form
        lexical: Arc<str>,
        /// Datatype IRI (e.g., xsd:string, xsd:integer)
        datatype: Arc<str>,
        /// Optional language tag (for rdf:langString)
        lang: Option<Arc<str>>,
    },
}

/// Well-known XSD datatype IRIs used by the aggregate functions
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}

impl Term {
    /// Create an IRI term
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Term::Iri(iri.into())
    }

    /// Create a blank node term
    pub fn blank(label: impl Into<Arc<str>>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Create an xsd:string literal
    pub fn literal(lexical: impl Into<Arc<str>>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Arc::from(xsd::STRING),
            lang: None,
        }
    }

    /// Create a typed literal
    pub fn typed(lexical: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: datatype.into(),
            lang: None,
        }
    }

    /// Create a language-tagged literal (rdf:langString)
    pub fn lang(lexical: impl Into<Arc<str>>, lang: impl Into<Arc<str>>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Arc::from("http://www.w3.org/1999/02/22-rdf-syntax-ns#langString"),
            lang: Some(lang.into()),
        }
    }

    /// Create an xsd:integer literal
    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), xsd::INTEGER)
    }

    /// Create an xsd:double literal
    pub fn double(value: f64) -> Self {
        Term::typed(value.to_string(), xsd::DOUBLE)
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    /// Check if this is an IRI
    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    /// Get the lexical form if this is a literal
    pub fn lexical_form(&self) -> Option<&str> {
        match self {
            Term::Literal { lexical, .. } => Some(lexical),
            _ => None,
        }
    }

    /// Interpret as a number if this is a numeric literal
    ///
    /// Returns `None` for IRIs, blank nodes, and literals whose lexical form
    /// does not parse as a number. NaN is rejected (it would poison sums).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Term::Literal { lexical, .. } => match lexical.parse::<f64>() {
                Ok(n) if !n.is_nan() => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    /// Interpret as an integer if this is an integer literal
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Term::Literal { lexical, .. } => lexical.parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal { lexical, lang: Some(lang), .. } => {
                write!(f, "\"{}\"@{}", lexical, lang)
            }
            Term::Literal { lexical, datatype, .. } => {
                if datatype.as_ref() == xsd::STRING {
                    write!(f, "\"{}\"", lexical)
                } else {
                    write!(f, "\"{}\"^^<{}>", lexical, datatype)
                }
            }
        }
    }
}

/// Graph component of a quad
///
/// `DefaultGraph` is the sentinel for "the store's default graph"; it is a
/// distinct value, not a named graph with a reserved IRI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum GraphName {
    /// The default graph sentinel
    #[default]
    DefaultGraph,
    /// A named graph identified by a term (IRI or blank node)
    Named(Term),
}

impl GraphName {
    /// Create a named graph from a term
    pub fn named(term: Term) -> Self {
        GraphName::Named(term)
    }

    /// Check if this is the default graph sentinel
    pub fn is_default(&self) -> bool {
        matches!(self, GraphName::DefaultGraph)
    }

    /// Get the graph term if this is a named graph
    pub fn as_named(&self) -> Option<&Term> {
        match self {
            GraphName::Named(t) => Some(t),
            GraphName::DefaultGraph => None,
        }
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphName::DefaultGraph => write!(f, "DEFAULT"),
            GraphName::Named(t) => write!(f, "{}", t),
        }
    }
}

/// A quad: subject, predicate, object, graph
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad {
    /// Subject term
    pub s: Term,
    /// Predicate term
    pub p: Term,
    /// Object term
    pub o: Term,
    /// Containing graph
    pub g: GraphName,
}

impl Quad {
    /// Create a quad in a specific graph
    pub fn new(s: Term, p: Term, o: Term, g: GraphName) -> Self {
        Self { s, p, o, g }
    }

    /// Create a triple in the default graph
    pub fn triple(s: Term, p: Term, o: Term) -> Self {
        Self {
            s,
            p,
            o,
            g: GraphName::DefaultGraph,
        }
    }
}
