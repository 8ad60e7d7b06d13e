//! The default predicate library.
//!
//! Predicates bridge goals to attribute providers (`resolve_*`, `now`,
//! counters, roles), notification sinks, calendar checks, RBAC checks and
//! cross-session dependency calls. Attribute references are atoms of the form
//! `provider:attribute`.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveTime, Weekday};
use ucon_types::{AttributeRef, Value, ValueKind};

use crate::builtins;
use crate::engine::DEFAULT_LIBRARY_ALIAS;
use crate::error::EvalError;
use crate::library::{Answers, Clause, Context, Library, Theory};
use crate::term::Term;

/// Builds the library every engine starts with.
pub(crate) fn default_library() -> Library {
    builtins::install(Library::new(DEFAULT_LIBRARY_ALIAS))
        .with_primitive("resolve_int", 2, |args, ctx| resolve(args, ctx, ValueKind::Int))
        .with_primitive("resolve_real", 2, |args, ctx| resolve(args, ctx, ValueKind::Real))
        .with_primitive("resolve_truth", 2, |args, ctx| resolve(args, ctx, ValueKind::Truth))
        .with_primitive("resolve_string", 2, |args, ctx| resolve(args, ctx, ValueKind::String))
        .with_primitive("resolve_string_list", 2, |args, ctx| {
            resolve(args, ctx, ValueKind::StringList)
        })
        .with_primitive("increment", 1, |args, ctx| update_counter(args, ctx, "increment"))
        .with_primitive("decrement", 1, |args, ctx| update_counter(args, ctx, "decrement"))
        .with_primitive("now", 2, now)
        .with_primitive("mod_is_zero", 2, mod_is_zero)
        .with_primitive("in_day_interval", 4, in_day_interval)
        .with_primitive("notify_monitor", 2, notify_monitor)
        .with_primitive("usage_notification", 5, usage_notification)
        .with_primitive("intersection", 3, intersection)
        .with_primitive("is_authorized_by_right", 3, is_authorized_by_right)
        .with_primitive("activate_role", 2, |args, ctx| update_role(args, ctx, "append"))
        .with_primitive("deactivate_role", 2, |args, ctx| update_role(args, ctx, "remove"))
        .with_primitive("resolve_role_permissions", 2, resolve_role_permissions)
        .with_primitive("rpa", 3, rpa)
        .with_primitive("dependency", 2, dependency)
        .with_theory(default_theory())
}

/// Rules layered over the primitives.
fn default_theory() -> Theory {
    let [x, y, z, t, d, s, o, r, n, m] =
        ["X", "Y", "Z", "T", "D", "S", "O", "R", "N", "M"].map(Term::var);
    let call = |functor: &str, args: &[&Term]| {
        Term::compound(functor, args.iter().map(|a| (*a).clone()))
    };

    Theory::from_clauses([
        Clause::fact(Term::compound("list_empty", [Term::empty_list()])),
        Clause::rule(
            call("within_interval", &[&x, &y, &z]),
            Term::and(call("=<", &[&x, &z]), call("<", &[&z, &y])),
        ),
        Clause::rule(
            call("non_empty_intersection", &[&x, &y]),
            Term::and(
                call("intersection", &[&x, &y, &z]),
                Term::not(call("list_empty", &[&z])),
            ),
        ),
        Clause::rule(
            call("time_restriction", &[&x, &y, &t]),
            Term::and(call("now", &[&t, &z]), call("within_interval", &[&x, &y, &z])),
        ),
        Clause::rule(
            call("day_time_restriction", &[&x, &y, &t, &d]),
            Term::and(call("now", &[&t, &z]), call("in_day_interval", &[&z, &x, &y, &d])),
        ),
        Clause::rule(
            call("purpose_notification", &[&t, &s, &o, &r, &m]),
            Term::and(
                call("now", &[&t, &x]),
                Term::and(
                    call("usage_notification", &[&x, &s, &o, &r, &n]),
                    call("notify_monitor", &[&n, &m]),
                ),
            ),
        ),
    ])
}

// ============================================================================
// Attribute resolution
// ============================================================================

fn attribute(args: &[Term], ctx: &Context<'_>) -> Result<(AttributeRef, Value), EvalError> {
    let raw = ctx.atom(args, 0)?;
    let reference = AttributeRef::parse(raw)?;
    let provider = ctx.provider(reference.provider())?;
    let value = provider
        .query(reference.attribute())
        .ok_or_else(|| EvalError::AttributeUnavailable {
            reference: raw.to_string(),
        })?;
    Ok((reference, value))
}

fn mismatch(reference: &AttributeRef, expected: ValueKind, found: &Value) -> EvalError {
    EvalError::ValueTypeMismatch {
        reference: reference.to_string(),
        expected,
        found: found.kind(),
    }
}

fn resolve(args: &[Term], ctx: &Context<'_>, kind: ValueKind) -> Result<Answers, EvalError> {
    let (reference, value) = attribute(args, ctx)?;
    let term = match (kind, value) {
        (ValueKind::Int, Value::Int(value)) => Term::int(value),
        (ValueKind::Real, Value::Real(value)) => Term::real(value),
        (ValueKind::Truth, Value::Truth(value)) => Term::truth(value),
        (ValueKind::String, Value::String(value)) => Term::atom(value),
        (ValueKind::StringList, Value::StringList(values)) => {
            Term::list(values.into_iter().map(Term::atom))
        }
        (expected, found) => return Err(mismatch(&reference, expected, &found)),
    };
    Ok(Answers::unify(args[1].clone(), term))
}

fn update_counter(args: &[Term], ctx: &Context<'_>, verb: &str) -> Result<Answers, EvalError> {
    let reference = AttributeRef::parse(ctx.atom(args, 0)?)?;
    let provider = ctx.provider(reference.provider())?;
    Ok(Answers::truth(provider.update(reference.attribute(), verb, None)))
}

fn update_role(args: &[Term], ctx: &Context<'_>, verb: &str) -> Result<Answers, EvalError> {
    let reference = AttributeRef::parse(ctx.atom(args, 0)?)?;
    let role = ctx.atom(args, 1)?;
    let provider = ctx.provider(reference.provider())?;
    Ok(Answers::truth(provider.update(
        reference.attribute(),
        verb,
        Some(Value::from(role)),
    )))
}

fn now(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let provider_id = ctx.atom(args, 0)?;
    let provider = ctx.provider(provider_id)?;
    let reference = AttributeRef::new(provider_id, "now");
    match provider.query("now") {
        Some(Value::Int(seconds)) => Ok(Answers::unify(args[1].clone(), Term::int(seconds))),
        Some(other) => Err(mismatch(&reference, ValueKind::Int, &other)),
        None => Err(EvalError::AttributeUnavailable {
            reference: reference.to_string(),
        }),
    }
}

// ============================================================================
// Arithmetic and calendar
// ============================================================================

fn mod_is_zero(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let dividend = ctx.int(args, 0)?;
    let divisor = ctx.int(args, 1)?;
    if divisor == 0 {
        return Err(EvalError::DivisionByZero {
            predicate: ctx.signature().to_string(),
        });
    }
    Ok(Answers::truth(dividend.wrapping_rem(divisor) == 0))
}

/// Parses `HH:MM:SS` (optionally with fractional seconds) or `HH:MM`.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Parses an English weekday name such as `Monday` (any case).
pub fn parse_weekday(text: &str) -> Option<Weekday> {
    match text.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn utc(seconds: i64) -> Result<DateTime<chrono::Utc>, EvalError> {
    DateTime::from_timestamp(seconds, 0).ok_or(EvalError::TimestampOutOfRange(seconds))
}

fn in_day_interval(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let timestamp = utc(ctx.int(args, 0)?)?;
    let time_of_day = |index| {
        let text = ctx.atom(args, index)?;
        parse_time_of_day(text).ok_or_else(|| EvalError::InvalidTimeOfDay(text.to_string()))
    };
    let start = time_of_day(1)?;
    let end = time_of_day(2)?;
    let days = ctx
        .atom_list(args, 3)?
        .into_iter()
        .map(|day| parse_weekday(day).ok_or_else(|| EvalError::UnknownWeekday(day.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let time = timestamp.time();
    Ok(Answers::truth(
        days.contains(&timestamp.weekday()) && start <= time && time < end,
    ))
}

// ============================================================================
// Notification
// ============================================================================

fn notify_monitor(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let message = ctx.atom(args, 0)?;
    let monitor = ctx.monitor(ctx.atom(args, 1)?)?;
    Ok(Answers::truth(monitor.notify(message)))
}

fn usage_notification(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let timestamp = utc(ctx.int(args, 0)?)?;
    let subject = ctx.atom(args, 1)?;
    let object = ctx.atom(args, 2)?;
    let right = ctx.atom(args, 3)?;
    let message = format!(
        "{}: Usage of object={object} from subject={subject} with right={right}.",
        timestamp.format("%Y-%m-%dT%H:%M:%S")
    );
    Ok(Answers::unify(args[4].clone(), Term::atom(message)))
}

// ============================================================================
// Sets and roles
// ============================================================================

fn contains_variable(term: &Term) -> bool {
    !term.variables().is_empty()
}

fn intersection(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let first = ctx.list(args, 0)?;
    let second = ctx.list(args, 1)?;

    let mut common: Vec<Term> = Vec::new();
    for item in second {
        if first.contains(item) && !common.contains(item) {
            common.push(item.clone());
        }
    }

    match &args[2] {
        Term::List(expected) if !contains_variable(&args[2]) => {
            let mut seen: Vec<&Term> = Vec::new();
            for item in expected.iter() {
                if !seen.contains(&item) {
                    seen.push(item);
                }
            }
            Ok(Answers::truth(
                seen.len() == common.len() && seen.iter().all(|item| common.contains(*item)),
            ))
        }
        _ => Ok(Answers::unify(args[2].clone(), Term::list(common))),
    }
}

fn is_authorized_by_right(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let subject = ctx.atom(args, 0)?;
    let right = ctx.atom(args, 1)?;
    let (reference, value) = attribute(&args[2..], ctx)?;
    match value {
        Value::RightsMap(rights) => Ok(Answers::truth(
            rights.get(subject).is_some_and(|granted| granted.contains(right)),
        )),
        other => Err(mismatch(&reference, ValueKind::RightsMap, &other)),
    }
}

fn resolve_role_permissions(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let (reference, value) = attribute(args, ctx)?;
    match value {
        Value::RolePermissions(assignments) => {
            let list = Term::list(assignments.into_iter().map(|(role, rights)| {
                Term::pair(Term::atom(role), Term::list(rights.into_iter().map(Term::atom)))
            }));
            Ok(Answers::unify(args[1].clone(), list))
        }
        other => Err(mismatch(&reference, ValueKind::RolePermissions, &other)),
    }
}

/// True iff some role at or below `role` in the positional order grants
/// `right`. Entries are `Role-[Rights...]` pairs, lowest role first.
fn rpa(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let role = ctx.atom(args, 0)?;
    let right = ctx.atom(args, 1)?;
    let assignments = ctx.list(args, 2)?;

    let mut granted = false;
    for entry in assignments {
        let (current_role, rights) = role_assignment(entry)?;
        if !granted && rights.contains(&right) {
            granted = true;
        }
        if current_role == role {
            return Ok(Answers::truth(granted));
        }
    }
    Ok(Answers::no())
}

fn role_assignment(entry: &Term) -> Result<(&str, HashSet<&str>), EvalError> {
    let invalid = || EvalError::InvalidRolePermissions(entry.to_string());
    let pair = entry
        .as_compound()
        .filter(|c| c.functor() == "-" && c.arity() == 2)
        .ok_or_else(invalid)?;
    let role = pair.args()[0].as_atom().ok_or_else(invalid)?;
    let rights = pair.args()[1]
        .as_list()
        .ok_or_else(invalid)?
        .iter()
        .filter_map(Term::as_atom)
        .collect();
    Ok((role, rights))
}

// ============================================================================
// Cross-session dependencies
// ============================================================================

fn dependency(args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
    let dependency = ctx.atom(args, 0)?;
    let session = ctx.atom(args, 1)?;
    let listener = ctx
        .registry()
        .provider(session)
        .and_then(|provider| provider.enforcement_listener())
        .ok_or_else(|| EvalError::ListenerNotFound(session.to_string()))?;
    Ok(Answers::truth(listener.do_dependency(dependency)))
}
