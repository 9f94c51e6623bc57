//! Persisted session state: the bearer token and the logged-in user record.
//!
//! The client reads the token before every request and removes both keys
//! when it detects an expired session. Anything that can hold string values
//! under string keys can back a session by implementing [`SessionStore`].

mod file;
mod memory;

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

pub use file::{FileSessionStore, SESSION_FILE};
pub use memory::MemorySessionStore;

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";

/// Key under which the serialized user record is stored.
pub const USER_KEY: &str = "user";

/// Persistent key/value storage for session data.
///
/// Writes are last-writer-wins. A missing key is `Ok(None)`, never an error.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Returns the stored bearer token, treating an empty value as absent.
pub fn token<S: SessionStore + ?Sized>(store: &S) -> Result<Option<String>> {
    Ok(store.get(TOKEN_KEY)?.filter(|t| !t.trim().is_empty()))
}

/// Stores the outcome of a successful login.
pub fn login<S, U>(store: &S, token: &str, user: Option<&U>) -> Result<()>
where
    S: SessionStore + ?Sized,
    U: Serialize + ?Sized,
{
    store.set(TOKEN_KEY, token)?;
    match user {
        Some(user) => {
            let json = serde_json::to_string(user).context("Failed to serialize user record")?;
            store.set(USER_KEY, &json)
        }
        None => store.remove(USER_KEY),
    }
}

/// Reads the user record back, if one was stored.
pub fn user<S, U>(store: &S) -> Result<Option<U>>
where
    S: SessionStore + ?Sized,
    U: DeserializeOwned,
{
    match store.get(USER_KEY)? {
        Some(json) => {
            let user = serde_json::from_str(&json).context("Stored user record is not valid JSON")?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Removes the token and the user record. Other keys are left alone.
pub fn logout<S: SessionStore + ?Sized>(store: &S) -> Result<()> {
    store.remove(TOKEN_KEY)?;
    store.remove(USER_KEY)
}

/// Shortens a token for log output: `abcd****wxyz`.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn test_token_ignores_blank_values() {
        let store = MemorySessionStore::new();
        assert_eq!(token(&store).unwrap(), None);

        store.set(TOKEN_KEY, "  ").unwrap();
        assert_eq!(token(&store).unwrap(), None);

        store.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(token(&store).unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_login_and_user_round_trip() {
        let store = MemorySessionStore::new();
        let alice = User {
            id: 5,
            name: "alice".into(),
        };

        login(&store, "tok", Some(&alice)).unwrap();

        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert_eq!(user::<_, User>(&store).unwrap(), Some(alice));
    }

    #[test]
    fn test_login_without_user_drops_stale_record() {
        let store = MemorySessionStore::new();
        store.set(USER_KEY, r#"{"id":1,"name":"old"}"#).unwrap();

        login::<_, User>(&store, "tok", None).unwrap();

        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_user_rejects_corrupt_record() {
        let store = MemorySessionStore::new();
        store.set(USER_KEY, "not json").unwrap();

        assert!(user::<_, User>(&store).is_err());
    }

    #[test]
    fn test_logout_removes_only_session_keys() {
        let mut store = MockSessionStore::new();
        store
            .expect_remove()
            .with(eq(TOKEN_KEY))
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_remove()
            .with(eq(USER_KEY))
            .times(1)
            .returning(|_| Ok(()));

        logout(&store).unwrap();
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "*****");
        assert_eq!(mask_token("abcdefghijklmnop"), "abcd****mnop");
    }
}
