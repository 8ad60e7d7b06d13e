//! Unification, comparison and list membership.

use std::cmp::Ordering;

use crate::bindings::Bindings;
use crate::error::EvalError;
use crate::library::{Answers, Context, Library};
use crate::term::Term;

/// Adds the general-purpose predicates to `library`.
pub(crate) fn install(library: Library) -> Library {
    library
        .with_primitive("=", 2, |args, _| Ok(Answers::unify(args[0].clone(), args[1].clone())))
        .with_primitive("\\=", 2, |args, _| {
            Ok(Answers::truth(!Bindings::new().unify(&args[0], &args[1])))
        })
        .with_primitive("==", 2, |args, _| Ok(Answers::truth(args[0] == args[1])))
        .with_primitive("\\==", 2, |args, _| Ok(Answers::truth(args[0] != args[1])))
        .with_primitive("<", 2, |args, ctx| compare(args, ctx, Ordering::is_lt))
        .with_primitive(">", 2, |args, ctx| compare(args, ctx, Ordering::is_gt))
        .with_primitive("=<", 2, |args, ctx| compare(args, ctx, Ordering::is_le))
        .with_primitive(">=", 2, |args, ctx| compare(args, ctx, Ordering::is_ge))
        .with_primitive("=:=", 2, |args, ctx| compare(args, ctx, Ordering::is_eq))
        .with_primitive("=\\=", 2, |args, ctx| compare(args, ctx, Ordering::is_ne))
        .with_primitive("member", 2, member)
}

fn compare(
    args: &[Term],
    ctx: &Context<'_>,
    accept: fn(Ordering) -> bool,
) -> Result<Answers, EvalError> {
    let ordering = match (&args[0], &args[1]) {
        (Term::Int(left), Term::Int(right)) => left.cmp(right),
        _ => {
            let left = ctx.number(args, 0)?;
            let right = ctx.number(args, 1)?;
            left.partial_cmp(&right).ok_or_else(|| {
                EvalError::custom(format!("{}: NaN is not comparable", ctx.signature()))
            })?
        }
    };
    Ok(Answers::truth(accept(ordering)))
}

fn member(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let items = ctx.list(args, 1)?;
    Ok(items.iter().fold(Answers::no(), |answers, item| {
        answers.or_unify(vec![(args[0].clone(), item.clone())])
    }))
}
