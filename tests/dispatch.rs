//! End-to-end webhook dispatch: signed requests in, callback JSON out.

use discord_interactions::{
    ApplicationCommand, Arguments, Client, Cog, CommandOption, Component, Context,
    InteractionHandler, ReplyPayload, Result,
};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{Value, json};
use std::any::Any;
use std::sync::{Arc, Mutex};

const SEED: [u8; 32] = [7u8; 32];
const TIMESTAMP: &str = "1700000000";

fn new_client() -> Client {
    let public_key = hex::encode(SigningKey::from_bytes(&SEED).verifying_key().to_bytes());
    Client::new("app_1", &public_key, "bot_token").unwrap()
}

fn sign(body: &str) -> String {
    let signing = SigningKey::from_bytes(&SEED);
    let mut message = TIMESTAMP.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    hex::encode(signing.sign(&message).to_bytes())
}

async fn post(client: &Client, body: &Value) -> (u16, Option<Value>) {
    let body = body.to_string();
    let signature = sign(&body);
    let response = client
        .handle_request(Some(&signature), Some(TIMESTAMP), body.as_bytes())
        .await;
    let json = response.as_json().cloned();
    (response.status, json)
}

#[tokio::test]
async fn tampered_request_is_rejected_before_any_lookup() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("ping", "Liveness")
                .attach_handler(|_ctx, _args| async { Ok(()) }),
        )
        .unwrap();
    client.sync_offline(&[("ping", "1")]).unwrap();

    let body = json!({ "type": 2, "data": { "id": "1", "name": "ping" } }).to_string();
    let signature = sign(&body);

    // Body tampered after signing
    let response = client
        .handle_request(Some(&signature), Some(TIMESTAMP), b"{\"type\":2}")
        .await;
    assert_eq!(response.status, 401);
    assert_eq!(response.body_bytes().as_ref(), b"BadSignature");

    // Signature tampered
    let response = client
        .handle_request(Some("00ff"), Some(TIMESTAMP), body.as_bytes())
        .await;
    assert_eq!(response.status, 401);

    assert_eq!(client.registry_lookups(), 0);
}

#[tokio::test]
async fn identical_pings_yield_identical_replies() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("noop", "Nothing")
                .attach_handler(|_ctx, _args| async { Ok(()) }),
        )
        .unwrap();
    client.sync_offline(&[("noop", "9")]).unwrap();

    let ping = json!({ "type": 1 });
    let first = post(&client, &ping).await;
    let second = post(&client, &ping).await;
    assert_eq!(first, second);
    assert_eq!(first.0, 200);
    assert_eq!(first.1.unwrap(), json!({ "type": 1 }));
    assert_eq!(client.registry_lookups(), 0);
}

#[tokio::test]
async fn slash_command_binds_integer_option() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in = seen.clone();

    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("pay", "Transfer credits")
                .option(CommandOption::integer("amount", "How much").required())
                .attach_handler(move |ctx, args| {
                    let seen = seen_in.clone();
                    async move {
                        *seen.lock().unwrap() = args.get_i64("amount");
                        ctx.reply_text("done");
                        Ok(())
                    }
                }),
        )
        .unwrap();
    client.sync_offline(&[("pay", "42")]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "42", "name": "pay",
                "options": [{ "name": "amount", "type": 4, "value": 7 }] }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(*seen.lock().unwrap(), Some(7));
    assert_eq!(body.unwrap()["data"]["content"], "done");
}

#[tokio::test]
async fn unknown_subcommand_is_a_404_not_a_crash() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("mod", "Moderation")
                .option(
                    CommandOption::subcommand("kick", "Kick someone")
                        .option(CommandOption::user("target", "Who").required()),
                )
                .subcommand_handler("kick", |_ctx, _args| async { Ok(()) }),
        )
        .unwrap();
    client.sync_offline(&[("mod", "50")]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "50", "name": "mod",
                "options": [{ "name": "ban", "type": 1, "options": [] }] }
        }),
    )
    .await;

    assert_eq!(status, 404);
    assert_eq!(body.unwrap()["error"], "command not found");
}

#[tokio::test]
async fn modal_missing_required_field_never_reaches_handler() {
    let invoked = Arc::new(Mutex::new(false));
    let invoked_in = invoked.clone();

    let mut client = new_client();
    client
        .register_component(
            Component::modal(move |_ctx, _args| {
                let invoked = invoked_in.clone();
                async move {
                    *invoked.lock().unwrap() = true;
                    Ok(())
                }
            })
            .custom_id("report_form")
            .field("reason", true)
            .field("details", false),
        )
        .unwrap();
    client.sync_offline(&[]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 5, "id": "i1", "token": "t1",
            "data": { "custom_id": "report_form",
                "components": [{ "type": 1, "components": [
                    { "custom_id": "details", "type": 4, "value": "nothing else" }
                ] }] }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert!(!*invoked.lock().unwrap());
    let body = body.unwrap();
    assert!(
        body["data"]["content"]
            .as_str()
            .unwrap()
            .contains("missing_field")
    );
}

#[tokio::test]
async fn concurrent_requests_see_only_their_own_interaction() {
    let alpha_seen = Arc::new(Mutex::new(None));
    let beta_seen = Arc::new(Mutex::new(None));
    let alpha_in = alpha_seen.clone();
    let beta_in = beta_seen.clone();

    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("alpha", "First")
                .option(CommandOption::string("tag", "Tag").required())
                .attach_handler(move |ctx, args| {
                    let seen = alpha_in.clone();
                    async move {
                        tokio::task::yield_now().await;
                        *seen.lock().unwrap() = args.get_str("tag").map(str::to_string);
                        ctx.reply_text("alpha done");
                        Ok(())
                    }
                }),
        )
        .unwrap();
    client
        .register(
            ApplicationCommand::new("beta", "Second")
                .option(CommandOption::string("tag", "Tag").required())
                .attach_handler(move |ctx, args| {
                    let seen = beta_in.clone();
                    async move {
                        tokio::task::yield_now().await;
                        *seen.lock().unwrap() = args.get_str("tag").map(str::to_string);
                        ctx.reply_text("beta done");
                        Ok(())
                    }
                }),
        )
        .unwrap();
    client
        .sync_offline(&[("alpha", "100"), ("beta", "200")])
        .unwrap();

    let alpha_body = json!({
        "type": 2, "id": "ia", "token": "ta",
        "data": { "id": "100", "name": "alpha",
            "options": [{ "name": "tag", "type": 3, "value": "from-alpha" }] }
    });
    let beta_body = json!({
        "type": 2, "id": "ib", "token": "tb",
        "data": { "id": "200", "name": "beta",
            "options": [{ "name": "tag", "type": 3, "value": "from-beta" }] }
    });

    let (alpha, beta) = tokio::join!(post(&client, &alpha_body), post(&client, &beta_body));

    assert_eq!(alpha.1.unwrap()["data"]["content"], "alpha done");
    assert_eq!(beta.1.unwrap()["data"]["content"], "beta done");
    assert_eq!(alpha_seen.lock().unwrap().as_deref(), Some("from-alpha"));
    assert_eq!(beta_seen.lock().unwrap().as_deref(), Some("from-beta"));
}

#[tokio::test]
async fn button_and_select_components_dispatch_by_custom_id() {
    let selections = Arc::new(Mutex::new(Vec::new()));
    let selections_in = selections.clone();

    let mut client = new_client();
    client
        .register_component(
            Component::button(|ctx, args| async move {
                assert!(args.is_empty());
                ctx.reply(ReplyPayload::text("clicked").ephemeral());
                Ok(())
            })
            .custom_id("confirm"),
        )
        .unwrap();
    client
        .register_component(
            Component::select_menu(move |_ctx, args| {
                let selections = selections_in.clone();
                async move {
                    *selections.lock().unwrap() =
                        args.values().iter().map(|v| v.to_string()).collect();
                    Ok(())
                }
            })
            .custom_id("colours"),
        )
        .unwrap();
    client.sync_offline(&[]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 3, "id": "i1", "token": "t1",
            "data": { "custom_id": "confirm", "component_type": 2 }
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["data"]["content"], "clicked");

    let (status, body) = post(
        &client,
        &json!({
            "type": 3, "id": "i2", "token": "t2",
            "data": { "custom_id": "colours", "component_type": 3,
                "values": ["red", "blue"] }
        }),
    )
    .await;
    // Handler chose not to respond; component falls back to a silent ack
    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["type"], 6);
    assert_eq!(*selections.lock().unwrap(), vec!["red", "blue"]);

    let (status, body) = post(
        &client,
        &json!({
            "type": 3, "id": "i3", "token": "t3",
            "data": { "custom_id": "ghost", "component_type": 2 }
        }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body.unwrap()["error"], "component not found");
}

#[tokio::test]
async fn context_menu_command_binds_resolved_target() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in = seen.clone();

    let mut client = new_client();
    client
        .register(ApplicationCommand::message("Quote").attach_handler(move |ctx, args| {
            let seen = seen_in.clone();
            async move {
                let target = args.first().unwrap().as_entity().unwrap().clone();
                *seen.lock().unwrap() = Some(target["content"].as_str().unwrap().to_string());
                ctx.reply_text("quoted");
                Ok(())
            }
        }))
        .unwrap();
    client.sync_offline(&[("Quote", "77")]).unwrap();

    let (status, _) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "77", "name": "Quote", "type": 3,
                "target_id": "555",
                "resolved": { "messages": { "555": { "id": "555", "content": "hold fast" } } } }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(seen.lock().unwrap().as_deref(), Some("hold fast"));
}

struct Economy {
    multiplier: i64,
}

impl Cog for Economy {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn cog_handler_receives_its_cog_first() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in = seen.clone();

    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("bonus", "Apply bonus")
                .option(CommandOption::integer("amount", "Base").required())
                .attach_cog_handler(Arc::new(Economy { multiplier: 3 }), move |cog, ctx, args| {
                    let seen = seen_in.clone();
                    async move {
                        let economy = cog.as_any().downcast_ref::<Economy>().unwrap();
                        *seen.lock().unwrap() =
                            Some(economy.multiplier * args.get_i64("amount").unwrap());
                        ctx.reply_text("applied");
                        Ok(())
                    }
                }),
        )
        .unwrap();
    client.sync_offline(&[("bonus", "88")]).unwrap();

    let (status, _) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "88", "name": "bonus",
                "options": [{ "name": "amount", "type": 4, "value": 5 }] }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(*seen.lock().unwrap(), Some(15));
}

#[tokio::test]
async fn declared_schema_round_trips_through_binding() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in = seen.clone();

    let mut client = new_client();
    let command = ApplicationCommand::new("post", "Publish")
        .option(CommandOption::string("title", "Title").required())
        .option(CommandOption::integer("priority", "Priority").required())
        .option(CommandOption::boolean("pinned", "Pin it"));
    let schema = command.registration_json();

    client
        .register(command.attach_handler(move |ctx, args| {
            let seen = seen_in.clone();
            async move {
                *seen.lock().unwrap() = Some((
                    args.get_str("title").unwrap().to_string(),
                    args.get_i64("priority").unwrap(),
                    args.get_bool("pinned"),
                ));
                ctx.reply_text("posted");
                Ok(())
            }
        }))
        .unwrap();
    client.sync_offline(&[("post", "300")]).unwrap();

    // Craft the interaction from the schema that would have been synced
    let supplied: Vec<Value> = schema["options"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|o| o["required"] == true)
        .map(|o| {
            let value = match o["type"].as_u64().unwrap() {
                3 => json!("hello"),
                4 => json!(9),
                other => panic!("unexpected option type {}", other),
            };
            json!({ "name": o["name"], "type": o["type"], "value": value })
        })
        .collect();

    let (status, _) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "300", "name": "post", "options": supplied }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        *seen.lock().unwrap(),
        Some(("hello".to_string(), 9, None))
    );
}

#[tokio::test]
async fn unresolved_reference_is_a_user_visible_diagnostic() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("promote", "Promote someone")
                .option(CommandOption::user("target", "Who").required())
                .attach_handler(|_ctx, _args| async { Ok(()) }),
        )
        .unwrap();
    client.sync_offline(&[("promote", "400")]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "400", "name": "promote",
                "options": [{ "name": "target", "type": 6, "value": "999" }],
                "resolved": { "users": {} } }
        }),
    )
    .await;

    assert_eq!(status, 200);
    let body = body.unwrap();
    assert!(
        body["data"]["content"]
            .as_str()
            .unwrap()
            .contains("unresolved_reference")
    );
}

struct Greeter;

#[async_trait::async_trait]
impl InteractionHandler for Greeter {
    async fn handle(&self, ctx: Context, args: Arguments) -> Result<()> {
        let name = args.get_str("name").unwrap_or("stranger");
        ctx.reply_text(format!("Ahoy, {}!", name));
        Ok(())
    }
}

#[tokio::test]
async fn object_style_handlers_dispatch_like_closures() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("greet", "Say hello")
                .option(CommandOption::string("name", "Who to greet"))
                .attach(Arc::new(Greeter)),
        )
        .unwrap();
    client.sync_offline(&[("greet", "500")]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "500", "name": "greet",
                "options": [{ "name": "name", "type": 3, "value": "captain" }] }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["data"]["content"], "Ahoy, captain!");
}

#[tokio::test]
async fn unregistered_command_tells_the_user() {
    let mut client = new_client();
    client
        .register(
            ApplicationCommand::new("known", "Known")
                .attach_handler(|_ctx, _args| async { Ok(()) }),
        )
        .unwrap();
    client.sync_offline(&[("known", "1")]).unwrap();

    let (status, body) = post(
        &client,
        &json!({
            "type": 2, "id": "i1", "token": "t1",
            "data": { "id": "does-not-exist", "name": "ghost" }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["data"]["content"], "Command not implemented.");
}
