//! Participant identity
//!
//! Every participant receives a join token. Callers present it with their
//! id and get back an [`Actor`] describing who they are in the match.

use async_trait::async_trait;

use crate::error::GameError;
use crate::model::{DocId, Fighter, Role};
use crate::store::Db;

/// An authenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Participant id
    pub id: DocId,
    /// Match they belong to
    pub match_id: DocId,
    /// Role at authentication time
    pub role: Role,
    /// Captain, for corner men
    pub team_id: Option<DocId>,
    /// Automated participant
    pub is_bot: bool,
}

impl From<&Fighter> for Actor {
    fn from(f: &Fighter) -> Self {
        Self {
            id: f.id.clone(),
            match_id: f.match_id.clone(),
            role: f.role,
            team_id: f.team_id.clone(),
            is_bot: f.is_bot,
        }
    }
}

/// Resolves credentials to actors.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    /// Validates `credential` for `actor_id`.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] for unknown participants and
    /// [`GameError::Unauthorized`] for a bad credential.
    async fn validate_actor(&self, actor_id: &DocId, credential: &str) -> Result<Actor, GameError>;
}

/// Checks the credential against the participant's stored join token.
#[derive(Debug, Clone)]
pub struct TokenAuthenticator {
    db: Db,
}

impl TokenAuthenticator {
    /// Creates an authenticator over `db`.
    #[must_use]
    pub const fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn validate_actor(&self, actor_id: &DocId, credential: &str) -> Result<Actor, GameError> {
        let fighter: Fighter = self
            .db
            .get(actor_id)
            .await?
            .ok_or_else(|| GameError::not_found("participant", actor_id))?;

        if !constant_time_eq(fighter.token.as_bytes(), credential.as_bytes()) {
            return Err(GameError::Unauthorized("invalid participant token".into()));
        }
        Ok(Actor::from(&fighter))
    }
}

/// Byte comparison whose timing does not depend on where inputs differ.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Fresh random token.
#[must_use]
pub fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(token: &str) -> Fighter {
        Fighter {
            id: "fighter_1".into(),
            seq: 0,
            match_id: "match_1".into(),
            name: "Ada".into(),
            role: Role::Fighter,
            hp: 100,
            max_hp: 100,
            knocked_out: false,
            win_streak: 0,
            team_id: None,
            is_bot: false,
            token: token.into(),
            seed: None,
        }
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(new_token(), new_token());
        assert_eq!(new_token().len(), 32);
    }

    #[tokio::test]
    async fn validates_stored_token() {
        let db = Db::memory();
        db.insert(&fighter("secret")).await.unwrap();
        let auth = TokenAuthenticator::new(db);

        let actor = auth
            .validate_actor(&"fighter_1".into(), "secret")
            .await
            .unwrap();
        assert_eq!(actor.match_id, DocId::from("match_1"));
        assert_eq!(actor.role, Role::Fighter);

        let err = auth
            .validate_actor(&"fighter_1".into(), "guess")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Unauthorized(_)));

        let err = auth
            .validate_actor(&"fighter_2".into(), "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::NotFound { .. }));
    }
}
