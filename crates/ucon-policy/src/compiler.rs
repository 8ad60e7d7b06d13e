//! Translation of policy documents into goal-tree policies.

use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use tracing::debug;
use ucon_logic::{Term, parse_time_of_day, parse_weekday};

use crate::document::{Argument, PolicyDocument, Predicate, Trigger};
use crate::error::{CompileError, Result};
use crate::policy::{OBJECT_PLACEHOLDER, Policy, RIGHT_PLACEHOLDER, SUBJECT_PLACEHOLDER};

/// Compiles `document` into a generic [`Policy`].
///
/// `postAccess` becomes the ended goal and `postRevocation` the revoked goal;
/// the post-permit goal is always `true`.
pub fn compile(document: &PolicyDocument) -> Result<Policy> {
    let mut compiler = Compiler::default();

    let ongoing_period = match document.ongoing_access.triggers.as_slice() {
        [] => None,
        [Trigger::Period { period }] => Some(Duration::from_millis(*period)),
        triggers => return Err(CompileError::MultipleTriggers(triggers.len())),
    };

    let policy = Policy::new(compiler.predicates(&document.pre_access.predicates)?)
        .with_ongoing(
            compiler.predicates(&document.ongoing_access.predicates)?,
            ongoing_period,
        )
        .with_post_revoked(compiler.predicates(&document.post_revocation.predicates)?)
        .with_post_ended(compiler.predicates(&document.post_access.predicates)?);

    debug!(policy = %document.id, "compiled policy document");
    Ok(policy)
}

/// Hands out fresh variables `_V1`, `_V2`, ... for resolver results.
#[derive(Default)]
struct Compiler {
    next_var: usize,
}

impl Compiler {
    fn fresh_var(&mut self) -> Term {
        self.next_var += 1;
        Term::var(format!("_V{}", self.next_var))
    }

    fn predicates(&mut self, predicates: &[Predicate]) -> Result<Term> {
        let mut goals = predicates.iter().map(|p| self.predicate(p));
        let Some(first) = goals.next() else {
            return Ok(Term::truth(true));
        };
        goals.try_fold(first?, |acc, goal| Ok(Term::and(acc, goal?)))
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<Term> {
        let goal = match predicate {
            Predicate::Notification { monitor, message } => Term::compound(
                "notify_monitor",
                [Term::atom(message.as_str()), Term::atom(monitor.as_str())],
            ),
            Predicate::UsageNotification {
                monitor,
                time_pip,
                subject_attr_pip,
                object_attr_pip,
            } => {
                let subject = self.fresh_var();
                let object = self.fresh_var();
                let resolve = |pip: &str, placeholder: &str, var: &Term| {
                    Term::compound(
                        "resolve_string",
                        [Term::atom(format!("{pip}:{placeholder}.identity")), var.clone()],
                    )
                };
                Term::and(
                    resolve(subject_attr_pip, SUBJECT_PLACEHOLDER, &subject),
                    Term::and(
                        resolve(object_attr_pip, OBJECT_PLACEHOLDER, &object),
                        Term::compound(
                            "purpose_notification",
                            [
                                Term::atom(time_pip.as_str()),
                                subject,
                                object,
                                Term::atom(RIGHT_PLACEHOLDER),
                                Term::atom(monitor.as_str()),
                            ],
                        ),
                    ),
                )
            }
            Predicate::TimeInterval {
                time_pip,
                start_time,
                end_time,
                time_zone,
            } => time_restriction(
                epoch_seconds(start_time, time_zone)?,
                epoch_seconds(end_time, time_zone)?,
                time_pip,
            ),
            Predicate::Duration {
                time_pip,
                start_time,
                duration,
                time_zone,
            } => {
                let start = epoch_seconds(start_time, time_zone)?;
                let end = start
                    .checked_add(*duration)
                    .ok_or(CompileError::DurationOutOfRange(*duration))?;
                time_restriction(start, end, time_pip)
            }
            Predicate::DayTime {
                time_pip,
                start_day_time,
                end_day_time,
                days,
            } => {
                for time in [start_day_time, end_day_time] {
                    if parse_time_of_day(time).is_none() {
                        return Err(CompileError::InvalidTimeOfDay(time.clone()));
                    }
                }
                if let Some(day) = days.iter().find(|day| parse_weekday(day).is_none()) {
                    return Err(CompileError::UnknownWeekday(day.clone()));
                }
                Term::compound(
                    "day_time_restriction",
                    [
                        Term::atom(start_day_time.as_str()),
                        Term::atom(end_day_time.as_str()),
                        Term::atom(time_pip.as_str()),
                        Term::list(days.iter().map(|day| Term::atom(day.as_str()))),
                    ],
                )
            }
            Predicate::And { first, second } => {
                Term::and(self.predicate(first)?, self.predicate(second)?)
            }
            Predicate::Or { first, second } => {
                Term::or(self.predicate(first)?, self.predicate(second)?)
            }
            Predicate::Not { value } => Term::not(self.predicate(value)?),
            Predicate::Custom { functor, args } => self.custom(functor, args),
        };
        Ok(goal)
    }

    /// Resolver side goals run first, then `functor(args)`.
    fn custom(&mut self, functor: &str, args: &[Argument]) -> Term {
        let mut side_goals = Vec::new();
        let mut call_args = Vec::with_capacity(args.len());

        for argument in args {
            let resolver = match argument {
                Argument::ResolveString { pip, attr } => Some(("resolve_string", pip, attr)),
                Argument::ResolveStringList { pip, attr } => {
                    Some(("resolve_string_list", pip, attr))
                }
                Argument::ResolveInt { pip, attr } => Some(("resolve_int", pip, attr)),
                Argument::ResolveReal { pip, attr } => Some(("resolve_real", pip, attr)),
                Argument::ResolveTruth { pip, attr } => Some(("resolve_truth", pip, attr)),
                Argument::ResolveSemaphore { pip, attr } => {
                    call_args.push(Term::atom(format!("{pip}:{attr}")));
                    None
                }
                Argument::LString { value } => {
                    call_args.push(Term::atom(value.as_str()));
                    None
                }
                Argument::LInt { value } => {
                    call_args.push(Term::int(*value));
                    None
                }
            };
            if let Some((predicate, pip, attr)) = resolver {
                let var = self.fresh_var();
                side_goals.push(Term::compound(
                    predicate,
                    [Term::atom(format!("{pip}:{attr}")), var.clone()],
                ));
                call_args.push(var);
            }
        }

        let call = Term::compound(functor, call_args);
        side_goals
            .into_iter()
            .rev()
            .fold(call, |acc, side_goal| Term::and(side_goal, acc))
    }
}

fn time_restriction(start: i64, end: i64, time_pip: &str) -> Term {
    Term::compound(
        "time_restriction",
        [Term::int(start), Term::int(end), Term::atom(time_pip)],
    )
}

fn epoch_seconds(local: &str, zone: &str) -> Result<i64> {
    let offset = parse_zone(zone)?;
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M"))
        .map_err(|_| CompileError::InvalidDateTime(local.to_string()))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|instant| instant.timestamp())
        .ok_or_else(|| CompileError::InvalidDateTime(local.to_string()))
}

/// `UTC`, `GMT`, `Z`, or a fixed offset with an optional `UTC`/`GMT` prefix.
fn parse_zone(zone: &str) -> Result<FixedOffset> {
    let unsupported = || CompileError::UnsupportedTimeZone(zone.to_string());
    let trimmed = zone.trim();
    if matches!(trimmed, "UTC" | "GMT" | "Z") {
        return FixedOffset::east_opt(0).ok_or_else(unsupported);
    }
    let offset = trimmed
        .strip_prefix("UTC")
        .or_else(|| trimmed.strip_prefix("GMT"))
        .unwrap_or(trimmed);
    if !offset.starts_with(['+', '-']) {
        return Err(unsupported());
    }
    offset.parse::<FixedOffset>().map_err(|_| unsupported())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::document::{OngoingBlock, PredicateBlock};

    fn document(pre_access: Vec<Predicate>) -> PolicyDocument {
        PolicyDocument {
            id: "p".into(),
            issuer: "issuer".into(),
            contexts: Vec::new(),
            rights: Vec::new(),
            pre_access: PredicateBlock { predicates: pre_access },
            ongoing_access: OngoingBlock::default(),
            post_access: PredicateBlock::default(),
            post_revocation: PredicateBlock::default(),
        }
    }

    fn custom(functor: &str, args: Vec<Argument>) -> Predicate {
        Predicate::Custom {
            functor: functor.into(),
            args,
        }
    }

    fn compile_pre(predicates: Vec<Predicate>) -> String {
        compile(&document(predicates)).unwrap().pre_access.to_string()
    }

    #[test]
    fn empty_blocks_compile_to_true() {
        let policy = compile(&document(Vec::new())).unwrap();
        assert_eq!(policy.pre_access, Term::truth(true));
        assert_eq!(policy.post_permit, Term::truth(true));
        assert_eq!(policy.ongoing_access, Term::truth(true));
        assert_eq!(policy.ongoing_period, None);
    }

    #[test]
    fn predicate_lists_fold_left() {
        let pre = compile_pre(vec![custom("a", vec![]), custom("b", vec![]), custom("c", vec![])]);
        assert_eq!(pre, "((a, b), c)");
    }

    #[test]
    fn custom_resolvers_become_side_goals() {
        let pre = compile_pre(vec![custom(
            "member",
            vec![
                Argument::ResolveString {
                    pip: "users".into(),
                    attr: "$SUBJECT.role".into(),
                },
                Argument::ResolveStringList {
                    pip: "objects".into(),
                    attr: "$OBJECT.roles".into(),
                },
            ],
        )]);
        assert_eq!(
            pre,
            "(resolve_string('users:$SUBJECT.role', _V1), \
             (resolve_string_list('objects:$OBJECT.roles', _V2), member(_V1, _V2)))"
        );
    }

    #[test]
    fn semaphores_and_literals_are_passed_verbatim() {
        let pre = compile_pre(vec![
            custom(
                "decrement",
                vec![Argument::ResolveSemaphore {
                    pip: "sem".into(),
                    attr: "$OBJECT.semaphore".into(),
                }],
            ),
            custom(
                "mod_is_zero",
                vec![Argument::LInt { value: 10 }, Argument::LInt { value: 5 }],
            ),
            custom("equal", vec![Argument::LString { value: "Hello".into() }]),
        ]);
        assert_eq!(
            pre,
            "((decrement('sem:$OBJECT.semaphore'), mod_is_zero(10, 5)), equal('Hello'))"
        );
    }

    #[test]
    fn combinators_keep_their_grouping() {
        let pre = compile_pre(vec![Predicate::Not {
            value: Box::new(Predicate::Or {
                first: Box::new(custom("a", vec![])),
                second: Box::new(Predicate::And {
                    first: Box::new(custom("b", vec![])),
                    second: Box::new(custom("c", vec![])),
                }),
            }),
        }]);
        assert_eq!(pre, "\\+((a; (b, c)))");
        assert_eq!(Term::parse(&pre).unwrap().to_string(), pre);
    }

    #[test]
    fn usage_notification_resolves_both_identities() {
        let pre = compile_pre(vec![Predicate::UsageNotification {
            monitor: "audit".into(),
            time_pip: "clock".into(),
            subject_attr_pip: "users".into(),
            object_attr_pip: "objects".into(),
        }]);
        assert_eq!(
            pre,
            "(resolve_string('users:$SUBJECT.identity', _V1), \
             (resolve_string('objects:$OBJECT.identity', _V2), \
             purpose_notification(clock, _V1, _V2, '$RIGHT', audit)))"
        );
    }

    #[test]
    fn notification_carries_message_and_monitor() {
        let pre = compile_pre(vec![Predicate::Notification {
            monitor: "audit".into(),
            message: "opened".into(),
        }]);
        assert_eq!(pre, "notify_monitor(opened, audit)");
    }

    #[test_case("UTC", 1_704_067_200, 1_704_070_800 ; "utc")]
    #[test_case("Z", 1_704_067_200, 1_704_070_800 ; "zulu")]
    #[test_case("+02:00", 1_704_060_000, 1_704_063_600 ; "positive offset")]
    #[test_case("UTC-01:00", 1_704_070_800, 1_704_074_400 ; "prefixed negative offset")]
    fn time_interval_converts_local_times(zone: &str, start: i64, end: i64) {
        let pre = compile_pre(vec![Predicate::TimeInterval {
            time_pip: "clock".into(),
            start_time: "2024-01-01T00:00".into(),
            end_time: "2024-01-01T01:00:00".into(),
            time_zone: zone.into(),
        }]);
        assert_eq!(pre, format!("time_restriction({start}, {end}, clock)"));
    }

    #[test]
    fn duration_adds_seconds_to_start() {
        let pre = compile_pre(vec![Predicate::Duration {
            time_pip: "clock".into(),
            start_time: "2024-01-01T00:00:00".into(),
            duration: 90,
            time_zone: "UTC".into(),
        }]);
        assert_eq!(pre, "time_restriction(1704067200, 1704067290, clock)");
    }

    #[test]
    fn day_time_keeps_textual_bounds() {
        let pre = compile_pre(vec![Predicate::DayTime {
            time_pip: "clock".into(),
            start_day_time: "07:00:00".into(),
            end_day_time: "18:00:00".into(),
            days: vec!["Monday".into(), "Friday".into()],
        }]);
        assert_eq!(
            pre,
            "day_time_restriction('07:00:00', '18:00:00', clock, ['Monday', 'Friday'])"
        );
    }

    #[test]
    fn rejects_malformed_calendar_input() {
        let interval = |start: &str, zone: &str| Predicate::TimeInterval {
            time_pip: "clock".into(),
            start_time: start.into(),
            end_time: "2024-01-01T01:00".into(),
            time_zone: zone.into(),
        };
        let day_time = |start: &str, day: &str| Predicate::DayTime {
            time_pip: "clock".into(),
            start_day_time: start.into(),
            end_day_time: "18:00".into(),
            days: vec![day.into()],
        };

        let error = |predicate| compile(&document(vec![predicate])).unwrap_err();
        assert!(matches!(
            error(interval("yesterday", "UTC")),
            CompileError::InvalidDateTime(_)
        ));
        assert!(matches!(
            error(interval("2024-01-01T00:00", "Europe/Berlin")),
            CompileError::UnsupportedTimeZone(_)
        ));
        assert!(matches!(
            error(day_time("25:00", "Monday")),
            CompileError::InvalidTimeOfDay(_)
        ));
        assert!(matches!(
            error(day_time("07:00", "Funday")),
            CompileError::UnknownWeekday(_)
        ));
    }

    #[test]
    fn single_trigger_sets_period_and_more_are_rejected() {
        let mut doc = document(Vec::new());
        doc.ongoing_access.triggers = vec![Trigger::Period { period: 250 }];
        assert_eq!(
            compile(&doc).unwrap().ongoing_period,
            Some(Duration::from_millis(250))
        );

        doc.ongoing_access.triggers.push(Trigger::Period { period: 500 });
        assert!(matches!(compile(&doc), Err(CompileError::MultipleTriggers(2))));
    }

    #[test]
    fn post_blocks_map_to_ended_and_revoked() {
        let mut doc = document(Vec::new());
        doc.post_access.predicates = vec![custom("ended", vec![])];
        doc.post_revocation.predicates = vec![custom("revoked", vec![])];

        let policy = compile(&doc).unwrap();
        assert_eq!(policy.post_access_ended, Term::atom("ended"));
        assert_eq!(policy.post_access_revoked, Term::atom("revoked"));
    }
}
