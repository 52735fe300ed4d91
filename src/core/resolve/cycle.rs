//! Cycle resolution: id, alias, cycle number, then name

use super::{first_success, Candidate, Resolution, ResolveError, ResolvedBy, Resolver, Strategy};
use crate::core::identity::EntityKind;
use crate::core::remote::EntityFilter;

/// Accepts `12` and `#12`
fn parse_cycle_number(input: &str) -> Option<u32> {
    input.strip_prefix('#').unwrap_or(input).parse().ok()
}

impl<'a> Resolver<'a> {
    /// id, alias, cycle number (within `teams` when given), name
    pub fn resolve_cycle(
        &self,
        input: &str,
        teams: &EntityFilter,
    ) -> Result<Option<Resolution>, ResolveError> {
        let kind = EntityKind::Cycle;
        first_success(vec![
            Strategy::new("id", || Ok(self.literal(kind, input))),
            Strategy::new("alias", || Ok(self.alias(kind, input))),
            Strategy::new("number", || self.cycle_by_number(input, teams)),
            Strategy::new("name", || self.cached_name(kind, input, teams)),
        ])
    }

    fn cycle_by_number(
        &self,
        input: &str,
        teams: &EntityFilter,
    ) -> Result<Option<Resolution>, ResolveError> {
        let Some(number) = parse_cycle_number(input) else {
            return Ok(None);
        };

        let mut matches: Vec<_> = self
            .cache
            .get(EntityKind::Cycle, teams)?
            .into_iter()
            .filter(|c| c.number == Some(number))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches
                .pop()
                .map(|c| Resolution::from_entity(c, ResolvedBy::Number))),
            _ => Err(ResolveError::DisambiguationRequired {
                kind: EntityKind::Cycle,
                input: input.to_string(),
                matches: matches
                    .into_iter()
                    .map(|c| Candidate {
                        detail: (!c.team_ids.is_empty()).then(|| c.team_ids.join(", ")),
                        id: c.id,
                        name: c.name,
                    })
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::core::remote::RemoteEntity;

    fn cycles() -> Fixture {
        Fixture::new(vec![
            (
                EntityKind::Cycle,
                RemoteEntity::new("cycle_1", "Sprint 12").with_number(12).with_team("team_web"),
            ),
            (
                EntityKind::Cycle,
                RemoteEntity::new("cycle_2", "Hardening").with_number(12).with_team("team_ops"),
            ),
            (
                EntityKind::Cycle,
                RemoteEntity::new("cycle_3", "Sprint 13").with_number(13).with_team("team_web"),
            ),
        ])
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_cycle_number("12"), Some(12));
        assert_eq!(parse_cycle_number("#7"), Some(7));
        assert_eq!(parse_cycle_number("Sprint 12"), None);
    }

    #[test]
    fn test_unique_number_resolves() {
        let fx = cycles();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let found = resolver.resolve_cycle("#13", &EntityFilter::none()).unwrap().unwrap();
        assert_eq!(found.id, "cycle_3");
        assert_eq!(found.method, ResolvedBy::Number);
    }

    #[test]
    fn test_shared_number_needs_team() {
        let fx = cycles();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let err = resolver.resolve_cycle("12", &EntityFilter::none()).unwrap_err();
        assert!(matches!(err, ResolveError::DisambiguationRequired { .. }));
        assert!(err.to_string().contains("team_ops"));

        let scoped = resolver
            .resolve_cycle("12", &EntityFilter::teams(vec!["team_ops".to_string()]))
            .unwrap()
            .unwrap();
        assert_eq!(scoped.id, "cycle_2");
    }

    #[test]
    fn test_name_after_number() {
        let fx = cycles();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let found = resolver.resolve_cycle("hardening", &EntityFilter::none()).unwrap().unwrap();
        assert_eq!(found.id, "cycle_2");
        assert_eq!(found.method, ResolvedBy::Name);
    }
}
