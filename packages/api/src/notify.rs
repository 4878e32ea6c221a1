//! Order-placed notification dispatch.
//!
//! Confirming an order publishes an [`OrderPlaced`] event onto a channel
//! consumed by a background worker task. The worker sends the customer
//! and manager emails; every failure on that path is logged and
//! swallowed, so the confirm response never depends on mail delivery.

use sea_orm::{DatabaseConnection, EntityTrait};
use tokio::sync::mpsc;

use crate::entity::{order, user};
use crate::mail::{DynMailClient, EmailMessage, templates};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlaced {
    pub order_id: i32,
    pub user_id: i32,
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<OrderPlaced>,
}

impl Notifier {
    /// Spawn the delivery worker and return its publishing handle.
    pub fn spawn(
        db: DatabaseConnection,
        mail_client: Option<DynMailClient>,
        manager_email: Option<String>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OrderPlaced>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) =
                    deliver(&db, mail_client.as_ref(), manager_email.as_deref(), &event).await
                {
                    tracing::warn!(
                        order_id = event.order_id,
                        user_id = event.user_id,
                        "order notification failed: {:#}",
                        err
                    );
                }
            }
        });

        Self { tx }
    }

    /// A notifier whose events are only captured, not delivered.
    /// Used by tests to assert what was dispatched.
    pub fn sink() -> (Self, mpsc::UnboundedReceiver<OrderPlaced>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget: enqueues the event and returns immediately.
    pub fn order_placed(&self, event: OrderPlaced) {
        if self.tx.send(event).is_err() {
            tracing::warn!("notification worker is gone, dropping order event");
        }
    }
}

async fn deliver(
    db: &DatabaseConnection,
    mail_client: Option<&DynMailClient>,
    manager_email: Option<&str>,
    event: &OrderPlaced,
) -> anyhow::Result<()> {
    // The rows can be gone by the time the worker runs; that is not an error.
    let Some(order) = order::Entity::find_by_id(event.order_id).one(db).await? else {
        return Ok(());
    };
    let Some(user) = user::Entity::find_by_id(event.user_id).one(db).await? else {
        return Ok(());
    };

    let Some(mail) = mail_client else {
        tracing::info!(
            order_id = order.id,
            "mail client not configured, skipping order emails"
        );
        return Ok(());
    };

    if !user.email.is_empty() {
        let (subject, body) = templates::order_accepted(order.id);
        if let Err(err) = mail
            .send(EmailMessage {
                to: user.email.clone(),
                subject,
                body,
            })
            .await
        {
            tracing::warn!(order_id = order.id, "customer email failed: {:#}", err);
        }
    }

    if let Some(manager) = manager_email {
        let (subject, body) = templates::new_order_for_manager(order.id, &user.username);
        if let Err(err) = mail
            .send(EmailMessage {
                to: manager.to_string(),
                subject,
                body,
            })
            .await
        {
            tracing::warn!(order_id = order.id, "manager email failed: {:#}", err);
        }
    }

    Ok(())
}
