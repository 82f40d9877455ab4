//! Send activation mails through the mail broker.
//!
//! The workflow only sees the [`Notifier`] seam; production publishes a
//! cloudevent to an AMQP queue consumed by the mail sender, tests bind a
//! recording double. Binding is the only difference.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::uri::{
    AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo,
};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde::Serialize;
use url::Url;

use crate::config::Mail;

const DEFAULT_AMQP_HOST: &str = "localhost";
const DEFAULT_AMQP_PORT: u16 = 5672;
const DEFAULT_AMQP_VHOST: &str = "/";

const CONTENT_ENCODING: &str = "utf8";
const CONTENT_TYPE: &str = "application/cloudevents+json";
const DATA_CONTENT_TYPE: &str = "application/json";
const CLOUDEVENT_VERSION: &str = "1.0";
const ID_LENGTH: usize = 12;

/// Notification transport failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Amqp(#[from] lapin::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error("invalid mail broker address")]
    Address(#[from] url::ParseError),
    #[error("unsupported mail broker scheme")]
    InvalidScheme,
    #[error("mail broker unreachable")]
    Unavailable,
}

/// Activation notification dispatch seam.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the mail sender to deliver the activation token.
    async fn send_activation(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), NotifyError>;
}

/// Mail templates list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Template {
    /// Deliver the account activation token.
    Activation,
}

#[derive(Debug, Serialize)]
struct Cloudevent<'a> {
    specversion: &'static str,
    r#type: &'static str,
    source: &'static str,
    id: String,
    time: String,
    datacontenttype: &'static str,
    data: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    to: Cow<'a, str>,
    template: Template,
    username: Cow<'a, str>,
    token: Cow<'a, str>,
}

/// Mail broker instance manager.
#[derive(Debug, Clone, Default)]
pub struct MailManager {
    queue: String,
    conn: Option<Arc<Connection>>,
}

impl MailManager {
    /// Create a new [`MailManager`].
    pub async fn new(config: &Mail) -> Result<Self, NotifyError> {
        let addr = Url::parse(&config.address)?;
        let uri = AMQPUri {
            scheme: AMQPScheme::from_str(addr.scheme())
                .map_err(|_| NotifyError::InvalidScheme)?,
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: config.username.clone(),
                    password: config.password.clone(),
                },
                host: addr.host_str().unwrap_or(DEFAULT_AMQP_HOST).into(),
                port: addr.port().unwrap_or(DEFAULT_AMQP_PORT),
            },
            vhost: config
                .vhost
                .clone()
                .unwrap_or(DEFAULT_AMQP_VHOST.to_string()),
            query: AMQPQueryString {
                channel_max: config.pool,
                ..Default::default()
            },
        };

        let conn_config = ConnectionProperties::default()
            .with_connection_name("anteroom_mail_client".into());
        let conn = Connection::connect_uri(uri, conn_config).await?;

        tracing::info!(%addr, queue = config.queue, "rabbitmq connected");

        Ok(Self {
            queue: config.queue.clone(),
            conn: Some(Arc::new(conn)),
        })
    }

    async fn create_channel(
        conn: Arc<Connection>,
        queue: &str,
    ) -> Result<Channel, NotifyError> {
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(channel)
    }

    fn create_event(data: Content) -> Cloudevent {
        let id = Alphanumeric.sample_string(&mut OsRng, ID_LENGTH);
        Cloudevent {
            specversion: CLOUDEVENT_VERSION,
            r#type: "org.anteroom.email",
            source: "org.anteroom.api",
            id,
            time: Utc::now().to_rfc3339(),
            datacontenttype: DATA_CONTENT_TYPE,
            data,
        }
    }
}

#[async_trait]
impl Notifier for MailManager {
    async fn send_activation(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), NotifyError> {
        // Unconfigured instances (no `mail` config entry) report success so
        // development registrations complete without a broker.
        let Some(conn) = &self.conn else {
            tracing::debug!(%username, "no mail broker, activation mail skipped");
            return Ok(());
        };

        let channel =
            Self::create_channel(Arc::clone(conn), &self.queue).await?;

        let content = Content {
            to: Cow::from(email),
            template: Template::Activation,
            username: Cow::from(username),
            token: Cow::from(token),
        };
        let payload = Self::create_event(content);
        let payload = serde_json::to_string(&payload)?;

        channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default()
                    .with_content_encoding(CONTENT_ENCODING.into())
                    .with_content_type(CONTENT_TYPE.into()),
            )
            .await?;

        tracing::trace!(%username, "activation event sent");

        Ok(())
    }
}

#[cfg(test)]
pub use mock::{MockNotifier, SentActivation};
