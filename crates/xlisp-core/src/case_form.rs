use crate::ast::Value;
use crate::env::ScopeRef;
use crate::error::XlispError;
use crate::eval::eval;

/// `(case subject test result ... default?)`. Test forms are compared as
/// literal data and never evaluated.
pub fn eval_case(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let Some((subject_form, clauses)) = args.split_first().filter(|(_, rest)| !rest.is_empty())
    else {
        return Err(XlispError::arity(
            "case expects a subject and at least one clause",
        ));
    };
    let subject = eval(subject_form, scope)?;
    let (pairs, default) = match clauses.split_last() {
        Some((last, pairs)) if clauses.len() % 2 == 1 => (pairs, Some(last)),
        _ => (clauses, None),
    };
    for pair in pairs.chunks(2) {
        if pair[0] == subject {
            return eval(&pair[1], scope);
        }
    }
    match default {
        Some(form) => eval(form, scope),
        None => Err(XlispError::no_match(format!(
            "no matching clause for '{}'",
            subject
        ))),
    }
}
