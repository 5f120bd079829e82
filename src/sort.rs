//! Total ordering over terms
//!
//! MIN/MAX accumulators and deterministic tests need a total order over
//! arbitrary terms, including mixed types. This module defines one.
//!
//! Ordering rules:
//! 1. Type class ordering: BlankNode < Iri < numeric Literal < other
//!    Literal
//! 2. Within blank nodes and IRIs: compare by string value
//! 3. Numeric literals (numeric *datatype* with a parseable value) compare
//!    by value with integer/double promotion; ties break on lexical form,
//!    datatype, language tag
//! 4. All other literals compare by lexical form, then datatype, then
//!    language tag
//!
//! Classing is by datatype, never by whether the lexical form happens to
//! parse: mixing value-based and string-based comparison in one class
//! breaks transitivity.

use crate::term::{xsd, Term};
use std::cmp::Ordering;

/// Numeric value of a literal, classed by datatype
///
/// Returns `Some` only for literals with a numeric datatype whose lexical
/// form parses (NaN rejected). A plain string that happens to look like a
/// number is not numeric.
fn numeric_value(term: &Term) -> Option<f64> {
    match term {
        Term::Literal { datatype, .. }
            if matches!(
                datatype.as_ref(),
                xsd::INTEGER | xsd::DECIMAL | xsd::FLOAT | xsd::DOUBLE
            ) =>
        {
            term.as_f64()
        }
        _ => None,
    }
}

/// Compare two terms under the engine's total order
pub fn compare_terms(a: &Term, b: &Term) -> Ordering {
    match (a, b) {
        (Term::BlankNode(a), Term::BlankNode(b)) => a.cmp(b),
        (Term::BlankNode(_), _) => Ordering::Less,
        (_, Term::BlankNode(_)) => Ordering::Greater,

        (Term::Iri(a), Term::Iri(b)) => a.cmp(b),
        (Term::Iri(_), _) => Ordering::Less,
        (_, Term::Iri(_)) => Ordering::Greater,

        (
            Term::Literal {
                lexical: la,
                datatype: da,
                lang: ga,
            },
            Term::Literal {
                lexical: lb,
                datatype: db,
                lang: gb,
            },
        ) => {
            let lexical = || la.cmp(lb).then_with(|| da.cmp(db)).then_with(|| ga.cmp(gb));
            match (numeric_value(a), numeric_value(b)) {
                // as_f64 rejects NaN, so total_cmp never sees one
                (Some(na), Some(nb)) => na.total_cmp(&nb).then_with(lexical),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => lexical(),
            }
        }
    }
}
