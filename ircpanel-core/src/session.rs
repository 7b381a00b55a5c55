//! Seam between the bridge and the IRC connection library.
//!
//! The controller and router only see [`Connector`] and [`Session`];
//! [`SdkConnector`] backs them with `ircpanel-sdk`.

use std::future::Future;
use std::time::Duration;

use ircpanel_sdk::client::{self, ClientHandle, ConnectConfig};
use ircpanel_sdk::event::Event;
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::identity::{ChannelTarget, ConnectionIdentity};

/// A live connection owned by the library.
pub trait Session: Clone + Send + Sync + 'static {
    fn join_channel(
        &self,
        channel: &ChannelTarget,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn channel_say(
        &self,
        channel: &ChannelTarget,
        text: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn close(&self, reason: &str) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Current nickname, after any fallback the server forced.
    fn nick(&self) -> String;
}

/// Opens sessions. One call is one connection attempt.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn request_connection(
        &self,
        identity: &ConnectionIdentity,
    ) -> impl Future<Output = Result<(Self::Session, mpsc::Receiver<Event>), SessionError>> + Send;
}

impl Session for ClientHandle {
    async fn join_channel(&self, channel: &ChannelTarget) -> Result<(), SessionError> {
        Ok(self.join(channel.as_str()).await?)
    }

    async fn channel_say(&self, channel: &ChannelTarget, text: &str) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(anyhow::anyhow!("connection is closed").into());
        }
        Ok(self.privmsg(channel.as_str(), text).await?)
    }

    async fn close(&self, reason: &str) -> Result<(), SessionError> {
        Ok(self.quit(Some(reason)).await?)
    }

    fn nick(&self) -> String {
        ClientHandle::nick(self)
    }
}

/// Connection settings that do not vary per attempt.
#[derive(Debug, Clone)]
pub struct SdkConnector {
    pub user: String,
    pub realname: String,
    pub tls: bool,
    pub tls_insecure: bool,
    pub connect_timeout: Option<Duration>,
}

impl Default for SdkConnector {
    fn default() -> Self {
        Self {
            user: "ircpanel".to_string(),
            realname: "ircpanel".to_string(),
            tls: false,
            tls_insecure: false,
            connect_timeout: None,
        }
    }
}

impl SdkConnector {
    fn config_for(&self, identity: &ConnectionIdentity) -> ConnectConfig {
        ConnectConfig {
            server_addr: identity.server_addr().to_string(),
            nick: identity.nick().to_string(),
            alt_nicks: identity.fallback_nicks().to_vec(),
            user: self.user.clone(),
            realname: self.realname.clone(),
            tls: self.tls,
            tls_insecure: self.tls_insecure,
            connect_timeout: self.connect_timeout,
        }
    }
}

impl Connector for SdkConnector {
    type Session = ClientHandle;

    async fn request_connection(
        &self,
        identity: &ConnectionIdentity,
    ) -> Result<(ClientHandle, mpsc::Receiver<Event>), SessionError> {
        let config = self.config_for(identity);
        tracing::info!(server = %config.server_addr, nick = %config.nick, "requesting connection");
        let conn = client::establish_connection(&config).await?;
        Ok(client::connect_with_stream(conn, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_fallback_nicks() {
        let connector = SdkConnector {
            tls: true,
            ..Default::default()
        };
        let identity = ConnectionIdentity::new("irc.example.net:6697", "carol").unwrap();
        let config = connector.config_for(&identity);
        assert_eq!(config.server_addr, "irc.example.net:6697");
        assert_eq!(config.nick, "carol");
        assert_eq!(config.alt_nicks, vec!["carol_2", "carol_3", "carol_4"]);
        assert!(config.tls);
    }
}
