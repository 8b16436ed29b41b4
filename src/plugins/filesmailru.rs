//! Files.mail.ru account plugin.

use async_trait::async_trait;

use crate::transport::{HttpTransport, RequestOptions, form_fields, parse_url};

use super::{AccountInfo, AccountPlugin, PluginError, PluginResult};

const AUTH_URL: &str = "https://swa.mail.ru/cgi-bin/auth";
const RETURN_PAGE: &str = "http://files.mail.ru/";
const WRONG_CREDENTIALS: &str = "Неверное имя пользователя или пароль";

/// Logs into Files.mail.ru through the mail.ru single sign-on.
#[derive(Debug, Clone, Default)]
pub struct FilesMailRuAccount;

impl FilesMailRuAccount {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AccountPlugin for FilesMailRuAccount {
    fn name(&self) -> &'static str {
        "FilesMailRu"
    }

    /// `user` is a full mailbox address such as `name@mail.ru`.
    async fn login(
        &self,
        transport: &dyn HttpTransport,
        user: &str,
        password: &str,
    ) -> PluginResult<()> {
        let (login, domain) = user
            .split_once('@')
            .filter(|(login, domain)| !login.is_empty() && !domain.is_empty())
            .ok_or_else(|| PluginError::InvalidUsername(user.to_string()))?;

        let fields = form_fields([
            ("Domain", domain),
            ("Login", login),
            ("Password", password),
            ("Page", RETURN_PAGE),
        ]);
        let page = transport
            .post_form(&parse_url(AUTH_URL)?, &fields, &RequestOptions::default())
            .await?
            .text();

        if page.contains(WRONG_CREDENTIALS) {
            return Err(PluginError::WrongPassword);
        }
        Ok(())
    }

    /// The site exposes no quota information.
    async fn load_account_info(
        &self,
        _transport: &dyn HttpTransport,
        _user: &str,
    ) -> PluginResult<AccountInfo> {
        Ok(AccountInfo::free())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::StubTransport;

    #[tokio::test]
    async fn login_splits_mailbox_address() {
        let stub = StubTransport::new().reply("<html>welcome</html>");
        FilesMailRuAccount::new()
            .login(&stub, "ivan@mail.ru", "parol")
            .await
            .unwrap();

        let request = &stub.requests()[0];
        assert_eq!(request.url.as_str(), AUTH_URL);
        assert_eq!(request.field("Login"), Some("ivan"));
        assert_eq!(request.field("Domain"), Some("mail.ru"));
        assert_eq!(request.field("Password"), Some("parol"));
        assert_eq!(request.field("Page"), Some(RETURN_PAGE));
    }

    #[tokio::test]
    async fn wrong_credentials_are_detected() {
        let stub = StubTransport::new()
            .reply("<div class=error>Неверное имя пользователя или пароль</div>");
        let result = FilesMailRuAccount::new().login(&stub, "ivan@mail.ru", "x").await;
        assert!(matches!(result, Err(PluginError::WrongPassword)));
    }

    #[tokio::test]
    async fn username_without_domain_is_rejected() {
        let stub = StubTransport::new();
        let result = FilesMailRuAccount::new().login(&stub, "ivan", "x").await;
        assert!(matches!(result, Err(PluginError::InvalidUsername(ref u)) if u == "ivan"));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn account_info_is_unknown() {
        let stub = StubTransport::new();
        let info = FilesMailRuAccount::new()
            .load_account_info(&stub, "ivan@mail.ru")
            .await
            .unwrap();
        assert_eq!(info, AccountInfo::free());
    }
}
