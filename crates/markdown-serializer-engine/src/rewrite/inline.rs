use crate::{
    locate::LocatedInlineExpression,
    markers::{INLINE_END, UpdateMode},
};

/// Splices serialized inline values into `text`.
///
/// Offsets in `expressions` must refer to `text`. Spans are spliced from the
/// last to the first so earlier offsets stay valid. An expression whose span
/// no longer holds its directive is skipped.
pub fn rewrite_expressions<'a, I>(text: &str, expressions: I) -> String
where
    I: IntoIterator<Item = (&'a LocatedInlineExpression, &'a str)>,
{
    let mut pending: Vec<_> = expressions.into_iter().collect();
    pending.sort_by_key(|(expr, _)| std::cmp::Reverse(expr.span.start));

    let mut out = text.to_string();
    for (expr, value) in pending {
        let value = value.trim();
        let eject = expr.mode == UpdateMode::OnceAndEject;

        if !eject && expr.existing_result.as_deref().map(str::trim) == Some(value) {
            continue;
        }

        let range = expr.span.start..expr.span.end;
        match out.get(range.clone()) {
            Some(current) if current.starts_with(&expr.directive) => {}
            _ => {
                log::warn!(
                    "inline expression {} moved before it could be written, skipping",
                    expr.expression
                );
                continue;
            }
        }

        let replacement = if eject {
            value.to_string()
        } else {
            format!("{}{value}{INLINE_END}", expr.directive)
        };
        out.replace_range(range, &replacement);
    }
    out
}
