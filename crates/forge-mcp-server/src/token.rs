//! Credential resolution
//!
//! With a `token_command` configured, every call runs the command and uses its trimmed standard
//! output as a bearer token. Without one, the credential forwarded by the transport (if any) is
//! used as is.

use std::collections::BTreeMap;
use std::ffi::OsString;

use tokio::process::Command;
use tracing::debug;

use crate::context::InvocationContext;
use crate::credential::Credential;
use crate::errors::TokenError;
use crate::settings::ServerSettings;

/// External command producing a bearer token
#[derive(Debug, Clone)]
pub struct TokenCommand {
    command: String,
    env: BTreeMap<String, String>,
    env_passthrough: bool,
}

impl TokenCommand {
    pub fn new(
        command: impl Into<String>,
        env: BTreeMap<String, String>,
        env_passthrough: bool,
    ) -> Self {
        Self {
            command: command.into(),
            env,
            env_passthrough,
        }
    }

    fn shell(&self) -> Command {
        let mut command = if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C");
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c");
            command
        };
        command.arg(&self.command);
        command
    }

    fn environment(&self) -> BTreeMap<OsString, OsString> {
        let inherited: Vec<(OsString, OsString)> = if self.env_passthrough {
            std::env::vars_os().collect()
        } else {
            Vec::new()
        };
        command_environment(inherited, &self.env)
    }

    /// Run the command and turn its output into a credential
    pub async fn run(&self, debug: bool) -> Result<Credential, TokenError> {
        let environment = self.environment();
        if debug {
            debug!(
                command = %self.command,
                env = ?environment.keys().collect::<Vec<_>>(),
                "Executing token command"
            );
        }

        let output = self
            .shell()
            .env_clear()
            .envs(&environment)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TokenError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                TokenError::Failed {
                    status: output.status,
                }
            } else {
                TokenError::FailedWithStderr {
                    status: output.status,
                    stderr,
                }
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let credential = Credential::bearer(stdout.trim());
        if credential.header_value().is_err() {
            return Err(TokenError::InvalidToken);
        }
        Ok(credential)
    }
}

/// Build the environment for the token command.
///
/// Starts from `inherited` and overlays `overrides`; an override replaces any inherited entry
/// with the same name, so every name appears exactly once. Inherited entries need not be
/// valid UTF-8.
pub fn command_environment(
    inherited: impl IntoIterator<Item = (OsString, OsString)>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<OsString, OsString> {
    let mut environment: BTreeMap<OsString, OsString> = inherited.into_iter().collect();
    environment.extend(
        overrides
            .iter()
            .map(|(key, value)| (OsString::from(key), OsString::from(value))),
    );
    environment
}

/// Resolves the credential for each call
#[derive(Debug, Clone)]
pub struct TokenProvider {
    command: Option<TokenCommand>,
    debug: bool,
}

impl TokenProvider {
    pub fn new(command: Option<TokenCommand>, debug: bool) -> Self {
        Self { command, debug }
    }

    pub fn from_settings(settings: &ServerSettings, debug: bool) -> Self {
        let command = settings.token_command().map(|command| {
            TokenCommand::new(command, settings.env.clone(), settings.env_passthrough)
        });
        Self::new(command, debug)
    }

    /// Resolve the credential for one call. `None` means no `Authorization` header is sent.
    pub async fn resolve(
        &self,
        context: &InvocationContext,
    ) -> Result<Option<Credential>, TokenError> {
        match &self.command {
            Some(command) => {
                let credential = command.run(self.debug).await?;
                if self.debug {
                    debug!(sha256 = %credential.fingerprint(), "Obtained token");
                }
                Ok(Some(credential))
            }
            None => {
                if self.debug {
                    match &context.credential {
                        Some(credential) => {
                            debug!(sha256 = %credential.fingerprint(), "Pass through token")
                        }
                        None => debug!("No token command and no pass through token"),
                    }
                }
                Ok(context.credential.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn value<'a>(environment: &'a BTreeMap<OsString, OsString>, key: &str) -> Option<&'a str> {
        environment.get(&OsString::from(key)).and_then(|v| v.to_str())
    }

    #[test]
    fn overrides_replace_inherited_entries() {
        let inherited = vec![
            (OsString::from("FOO"), OsString::from("old")),
            (OsString::from("HOME"), OsString::from("/home/forge")),
        ];

        let environment = command_environment(inherited, &overrides(&[("FOO", "bar")]));

        assert_eq!(environment.len(), 2);
        assert_eq!(value(&environment, "FOO"), Some("bar"));
        assert_eq!(value(&environment, "HOME"), Some("/home/forge"));
    }

    #[test]
    fn without_passthrough_only_overrides_are_set() {
        let command = TokenCommand::new("true", overrides(&[("FOO", "bar")]), false);

        let environment = command.environment();

        assert_eq!(environment.len(), 1);
        assert_eq!(value(&environment, "FOO"), Some("bar"));
    }

    #[test]
    fn passthrough_copies_the_process_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FORGE_TEST_INHERITED", "yes");
            jail.set_env("FOO", "inherited");
            let command = TokenCommand::new("true", overrides(&[("FOO", "bar")]), true);

            let environment = command.environment();

            assert_eq!(value(&environment, "FORGE_TEST_INHERITED"), Some("yes"));
            assert_eq!(value(&environment, "FOO"), Some("bar"));
            assert_eq!(environment.keys().filter(|k| *k == "FOO").count(), 1);
            Ok(())
        });
    }

    #[tokio::test]
    async fn without_command_or_context_there_is_no_credential() {
        let provider = TokenProvider::new(None, false);

        let credential = provider
            .resolve(&InvocationContext::default())
            .await
            .unwrap();

        assert!(credential.is_none());
    }

    #[tokio::test]
    async fn without_command_the_context_credential_is_forwarded() {
        let provider = TokenProvider::new(None, true);
        let context = InvocationContext::default()
            .with_credential(Some(Credential::from_header("Bearer inbound")));

        let credential = provider.resolve(&context).await.unwrap().unwrap();

        assert_eq!(credential.expose(), "Bearer inbound");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[tokio::test]
        async fn command_output_is_trimmed_and_prefixed() {
            let command = TokenCommand::new("echo '  abc123  '", BTreeMap::new(), false);
            let provider = TokenProvider::new(Some(command), false);

            let credential = provider
                .resolve(&InvocationContext::default())
                .await
                .unwrap()
                .unwrap();

            assert_eq!(credential.expose(), "Bearer abc123");
        }

        #[tokio::test]
        async fn command_takes_precedence_over_context_credential() {
            let command = TokenCommand::new("echo fresh", BTreeMap::new(), false);
            let provider = TokenProvider::new(Some(command), false);
            let context = InvocationContext::default()
                .with_credential(Some(Credential::from_header("Bearer inbound")));

            let credential = provider.resolve(&context).await.unwrap().unwrap();

            assert_eq!(credential.expose(), "Bearer fresh");
        }

        #[tokio::test]
        async fn command_sees_overridden_environment() {
            let command =
                TokenCommand::new("printf %s \"$FOO\"", overrides(&[("FOO", "bar")]), true);

            let credential = command.run(false).await.unwrap();

            assert_eq!(credential.expose(), "Bearer bar");
        }

        #[tokio::test]
        async fn failing_command_reports_stderr() {
            let command = TokenCommand::new("echo denied >&2; exit 3", BTreeMap::new(), false);

            let error = command.run(false).await.unwrap_err();

            assert!(matches!(error, TokenError::FailedWithStderr { .. }));
            let message = error.to_string();
            assert!(message.starts_with("token_command failed"));
            assert!(message.contains("denied"));
        }

        #[tokio::test]
        async fn failing_command_without_stderr_reports_status() {
            let command = TokenCommand::new("exit 1", BTreeMap::new(), false);

            let error = command.run(false).await.unwrap_err();

            assert!(matches!(error, TokenError::Failed { .. }));
        }

        #[tokio::test]
        async fn blank_output_sends_an_empty_bearer_token() {
            let command = TokenCommand::new("echo '   '", BTreeMap::new(), false);

            let credential = command.run(false).await.unwrap();

            assert_eq!(credential.expose(), "Bearer ");
        }

        #[test]
        fn non_utf8_inherited_values_are_kept() {
            use std::os::unix::ffi::{OsStrExt, OsStringExt};

            let inherited = vec![(
                OsString::from("FORGE_RAW"),
                OsString::from_vec(vec![b'a', 0xff]),
            )];

            let environment = command_environment(inherited, &BTreeMap::new());

            assert_eq!(
                environment
                    .get(&OsString::from("FORGE_RAW"))
                    .map(|v| v.as_bytes()),
                Some(&[b'a', 0xff][..])
            );
        }
    }
}
