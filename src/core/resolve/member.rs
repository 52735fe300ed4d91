//! Member resolution: id, alias, email, then name within optional teams

use super::{first_success, single_match, Resolution, ResolveError, ResolvedBy, Resolver, Strategy};
use crate::core::identity::EntityKind;
use crate::core::remote::EntityFilter;

impl<'a> Resolver<'a> {
    pub fn resolve_member(
        &self,
        input: &str,
        teams: &EntityFilter,
    ) -> Result<Option<Resolution>, ResolveError> {
        let kind = EntityKind::Member;
        first_success(vec![
            Strategy::new("id", || Ok(self.literal(kind, input))),
            Strategy::new("alias", || Ok(self.confirmed_alias(kind, input))),
            Strategy::new("email", || self.member_by_email(input)),
            Strategy::new("name", || self.member_by_name(input, teams)),
        ])
    }

    fn member_by_email(&self, input: &str) -> Result<Option<Resolution>, ResolveError> {
        if !input.contains('@') {
            return Ok(None);
        }
        Ok(self
            .remote()
            .find_member_by_email(input)?
            .map(|member| Resolution::from_entity(member, ResolvedBy::Email)))
    }

    /// Never picks one of several same-named members
    fn member_by_name(
        &self,
        input: &str,
        teams: &EntityFilter,
    ) -> Result<Option<Resolution>, ResolveError> {
        let matches = self
            .cache
            .find_all_by_name_ignore_case(EntityKind::Member, input, teams)?;
        single_match(EntityKind::Member, input, matches, ResolvedBy::Name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::core::alias::Scope;
    use crate::core::remote::RemoteEntity;

    fn members() -> Fixture {
        Fixture::new(vec![
            (
                EntityKind::Member,
                RemoteEntity::new("user_1", "Alex Kim")
                    .with_email("alex.kim@example.com")
                    .with_team("team_web"),
            ),
            (
                EntityKind::Member,
                RemoteEntity::new("user_2", "alex kim")
                    .with_email("akim@example.com")
                    .with_team("team_ops"),
            ),
            (
                EntityKind::Member,
                RemoteEntity::new("user_3", "Jordan Lee").with_email("jordan@example.com"),
            ),
        ])
    }

    #[test]
    fn test_email_lookup() {
        let fx = members();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let found = resolver
            .resolve_member("JORDAN@example.com", &EntityFilter::none())
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "user_3");
        assert_eq!(found.method, ResolvedBy::Email);
    }

    #[test]
    fn test_same_name_requires_disambiguation() {
        let fx = members();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let err = resolver
            .resolve_member("Alex Kim", &EntityFilter::none())
            .unwrap_err();
        match &err {
            ResolveError::DisambiguationRequired { matches, .. } => {
                assert_eq!(matches.len(), 2);
                assert!(matches
                    .iter()
                    .any(|c| c.detail.as_deref() == Some("akim@example.com")));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("alex.kim@example.com"));
    }

    #[test]
    fn test_team_filter_narrows_name_matches() {
        let fx = members();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let found = resolver
            .resolve_member("alex kim", &EntityFilter::teams(vec!["team_ops".to_string()]))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "user_2");
        assert_eq!(found.method, ResolvedBy::Name);
    }

    #[test]
    fn test_alias_is_confirmed() {
        let fx = members();
        fx.store
            .add(&fx.remote, EntityKind::Member, "jl", "user_3", Scope::Global, true)
            .unwrap();
        fx.store
            .add(&fx.remote, EntityKind::Member, "ghost", "user_9", Scope::Global, true)
            .unwrap();
        let cache = fx.cache();
        let resolver = Resolver::new(&fx.store, &cache, fx.name_cache());

        let found = resolver.resolve_member("jl", &EntityFilter::none()).unwrap().unwrap();
        assert_eq!(found.method, ResolvedBy::Alias);
        assert_eq!(found.name.as_deref(), Some("Jordan Lee"));

        assert!(resolver.resolve_member("ghost", &EntityFilter::none()).unwrap().is_none());
    }
}
