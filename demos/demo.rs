//! Demo: send a message to a local Mailpit instance and watch the events.
//!
//! Run with a Mailpit server on localhost:
//! `cargo run --example demo`

use mailpit_client::{Client, SendAddress, SendRequest};

#[tokio::main]
async fn main() -> Result<(), mailpit_client::Error> {
    let client = Client::new("http://localhost:8025")?;

    let info = client.get_info().await?;
    println!("Mailpit {} with {} messages", info.version, info.messages);

    let subscription = client.on_event("*", |event| {
        println!("event: {} {}", event.kind, event.data);
    });
    client.connect_websocket();

    let wait = client.wait_for_event("new");
    let confirmation = client
        .send_message(&SendRequest {
            from: SendAddress::named("sender@example.test", "Sender"),
            to: vec![SendAddress::new("recipient@example.test")],
            subject: Some("Hello from mailpit-client".to_string()),
            text: Some("This is a demo message.".to_string()),
            attachments: None,
            bcc: None,
            cc: None,
            html: None,
            headers: None,
            reply_to: None,
            tags: None,
        })
        .await?;
    println!("sent message {}", confirmation.id);

    let event = wait.await?;
    println!("server announced it: {}", event.data);

    let messages = client.list_messages(0, 10).await?;
    for message in messages.messages {
        println!("{}: {}", message.from.address, message.subject);
    }

    client.delete_messages(Some(vec![confirmation.id])).await?;
    subscription.unsubscribe();
    client.disconnect();
    Ok(())
}
