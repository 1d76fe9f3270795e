//! Counter example - template, click listener and next-frame updates

use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use dom::{DomArena, DomSerializer, NodeIndex, SyntheticEvent};
use interpreter::{EditWriter, TemplateDescriptor, ROOT_ID};
use runtime::{Session, SessionConfig, SessionEvent, Timing};

const COUNTER_TEMPLATE: &str = r#"{
    "root": {
        "type": "element",
        "tag": "button",
        "attrs": [{"type": "static", "name": "class", "value": "counter"}],
        "children": [{"type": "dynamic_text", "slot": 0}]
    }
}"#;

const BUTTON: u64 = 1;
const LABEL: u64 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Sessions are single-threaded, scheduled callbacks run on this set
    let local = tokio::task::LocalSet::new();
    local.run_until(run()).await
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = SessionConfig {
        id: "counter-example".to_string(),
        ..SessionConfig::default()
    };
    let (arena, mount) = DomArena::with_mount("main")?;
    let session = Rc::new(Session::new(config, arena, mount));
    let mut events = session.subscribe();

    session.register_template(1, &TemplateDescriptor::from_json(COUNTER_TEMPLATE)?)?;

    let mut w: EditWriter<NodeIndex> = EditWriter::new();
    w.load_template(1, BUTTON)
        .set_node(0, "count: 0")
        .assign_slot_id(0, LABEL)
        .new_event_listener("click", BUTTON, 1, true)
        .append_children(Some(ROOT_ID), 1);
    let (bytes, values) = w.finish();
    session.apply(&bytes, values)?;
    println!("mounted: {}", render(&session)?);

    let button = session.with_interpreter(|i| i.node(BUTTON).copied())??;

    for count in 1..=3 {
        session.with_interpreter(|i| {
            i.host()
                .dispatch_event(button, &SyntheticEvent::new("click").with_field("clientX", 12))
        })??;

        loop {
            match events.recv().await? {
                SessionEvent::UserEvent(record) => {
                    println!("event: {}", serde_json::to_string(&record)?);
                    break;
                }
                other => println!("session: {:?}", other),
            }
        }

        let handle = Rc::clone(&session);
        let text = format!("count: {}", count);
        session.scheduler().request_local(Timing::NextFrame, move || {
            let mut w = EditWriter::new();
            w.set_text(LABEL, text);
            let (bytes, values) = w.finish();
            if let Err(e) = handle.apply(&bytes, values) {
                tracing::error!("update failed: {}", e);
            }
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        println!("frame {}: {}", count, render(&session)?);
    }

    session.stop();
    Ok(())
}

fn render(session: &Session<DomArena>) -> Result<String, Box<dyn Error>> {
    let html = session.with_interpreter(|i| -> Result<String, Box<dyn Error>> {
        let mount = *i.node(ROOT_ID)?;
        Ok(DomSerializer::new().inner_html(i.host(), mount)?)
    })??;
    Ok(html)
}
