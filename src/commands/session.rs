use anyhow::{Context, Result};
use log::info;
use std::io::Write;
use std::path::Path;

use crate::{
    runtime::Runtime,
    session::{self, FileSessionStore},
};

/// Stores a token (and optionally a user record) obtained from a login.
#[tracing::instrument(skip(runtime, token, user))]
pub fn login<R: Runtime>(runtime: R, app_dir: &Path, token: &str, user: Option<&str>) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }
    let user: Option<serde_json::Value> = user
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--user must be valid JSON")?;

    let store = FileSessionStore::in_dir(runtime, app_dir);
    session::login(&store, token, user.as_ref())?;
    info!("Stored session token {}", session::mask_token(token));
    println!("Logged in.");
    Ok(())
}

/// Prints the stored session.
#[tracing::instrument(skip(runtime))]
pub fn show<R: Runtime>(runtime: R, app_dir: &Path) -> Result<()> {
    let store = FileSessionStore::in_dir(runtime, app_dir);
    let stdout = std::io::stdout();
    print_session(&mut stdout.lock(), &store)
}

/// Forgets the stored session.
#[tracing::instrument(skip(runtime))]
pub fn logout<R: Runtime>(runtime: R, app_dir: &Path) -> Result<()> {
    let store = FileSessionStore::in_dir(runtime, app_dir);
    session::logout(&store)?;
    println!("Logged out.");
    Ok(())
}

pub(crate) fn print_session<W, S>(out: &mut W, store: &S) -> Result<()>
where
    W: Write,
    S: session::SessionStore,
{
    match session::token(store)? {
        Some(token) => {
            writeln!(out, "Logged in (token {})", session::mask_token(&token))?;
            if let Some(user) = session::user::<_, serde_json::Value>(store)? {
                writeln!(out, "User: {}", user)?;
            }
        }
        None => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::session::{MemorySessionStore, SessionStore, TOKEN_KEY, USER_KEY};
    use tempfile::tempdir;

    #[test]
    fn test_login_show_logout() {
        let dir = tempdir().unwrap();

        login(
            RealRuntime,
            dir.path(),
            "tok-1234567890",
            Some(r#"{"id":5,"name":"alice"}"#),
        )
        .unwrap();

        let store = FileSessionStore::in_dir(RealRuntime, dir.path());
        assert_eq!(
            store.get(TOKEN_KEY).unwrap().as_deref(),
            Some("tok-1234567890")
        );

        let mut out = Vec::new();
        print_session(&mut out, &store).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Logged in (token tok-****7890)"));
        assert!(out.contains(r#""name":"alice""#));

        logout(RealRuntime, dir.path()).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_login_rejects_bad_input() {
        let dir = tempdir().unwrap();

        assert!(login(RealRuntime, dir.path(), "  ", None).is_err());
        let err = login(RealRuntime, dir.path(), "tok", Some("{not json")).unwrap_err();
        assert!(err.to_string().contains("--user"));
    }

    #[test]
    fn test_print_session_logged_out() {
        let store = MemorySessionStore::new();
        let mut out = Vec::new();

        print_session(&mut out, &store).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Not logged in\n");
    }
}
