use bridge_proto::channel::{
    validate, ChannelConfig, ChannelKind, FieldMap, GmailConfig, SmsConfig, Source,
    TelegramConfig, WhatsAppConfig,
};
use bridge_proto::store::{ConfigStore, ConfigUpdate};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_710_000_000, 0).unwrap()
}

fn sample(kind: ChannelKind) -> ChannelConfig {
    match kind {
        ChannelKind::Telegram => ChannelConfig::Telegram(TelegramConfig {
            bot_token: "123456:ABC".into(),
            chat_id: "987".into(),
        }),
        ChannelKind::WhatsApp => ChannelConfig::WhatsApp(WhatsAppConfig {
            api_key: "555".into(),
            phone: "+15550001".into(),
        }),
        ChannelKind::Gmail => ChannelConfig::Gmail(GmailConfig {
            email: "me@gmail.com".into(),
            app_password: "abcd efgh".into(),
        }),
        ChannelKind::Sms => ChannelConfig::Sms(SmsConfig {
            twilio_sid: "AC123".into(),
            twilio_token: "secret".into(),
            from: "+15550002".into(),
            to: "+15550003".into(),
        }),
    }
}

fn update(channel: ChannelConfig) -> ConfigUpdate {
    ConfigUpdate {
        channel,
        source: Source::Agent,
        ngrok_token: "ngrok-token".into(),
    }
}

#[tokio::test]
async fn save_then_load_returns_same_block_for_every_kind() {
    for kind in ChannelKind::ALL {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("bridge-config.json"), 5);

        store.save_at(update(sample(kind)), t0()).await.unwrap();

        let loaded = store.load();
        assert_eq!(loaded.channel_config(kind), Some(sample(kind)), "{kind}");
        assert_eq!(loaded.ngrok_token, "ngrok-token");
    }
}

#[tokio::test]
async fn saving_one_kind_preserves_the_others() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("bridge-config.json"), 5);

    store
        .save_at(update(sample(ChannelKind::Telegram)), t0())
        .await
        .unwrap();
    store
        .save_at(update(sample(ChannelKind::Gmail)), t0() + Duration::seconds(5))
        .await
        .unwrap();

    let loaded = store.load();
    assert_eq!(
        loaded.channel_config(ChannelKind::Telegram),
        Some(sample(ChannelKind::Telegram))
    );
    assert_eq!(
        loaded.channel_config(ChannelKind::Gmail),
        Some(sample(ChannelKind::Gmail))
    );
    assert_eq!(loaded.channel, Some(ChannelKind::Gmail));
    assert_eq!(
        loaded.configured_kinds(),
        vec![ChannelKind::Telegram, ChannelKind::Gmail]
    );
}

#[tokio::test]
async fn recents_are_bounded_and_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("bridge-config.json"), 3);

    let order = [
        ChannelKind::Telegram,
        ChannelKind::WhatsApp,
        ChannelKind::Gmail,
        ChannelKind::Sms,
    ];
    for (i, kind) in order.into_iter().enumerate() {
        store
            .save_at(update(sample(kind)), t0() + Duration::minutes(i as i64))
            .await
            .unwrap();
        let recents = store.recents();
        assert_eq!(recents.len(), (i + 1).min(3));
        assert_eq!(recents.list()[0].kind(), Some(kind));
    }

    // Re-saving an existing kind moves it to the front without duplicating it.
    store
        .save_at(
            update(sample(ChannelKind::Gmail)),
            t0() + Duration::minutes(10),
        )
        .await
        .unwrap();
    let keys: Vec<String> = store
        .recents()
        .list()
        .iter()
        .map(|e| e.config_key.clone())
        .collect();
    assert_eq!(keys, vec!["gmail", "sms", "whatsapp"]);
    assert_eq!(
        store.recents().get(0).unwrap().last_used,
        t0() + Duration::minutes(10)
    );
}

#[tokio::test]
async fn validated_form_values_are_stored_trimmed() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("bridge-config.json"), 5);

    let mut fields = FieldMap::new();
    fields.insert("api_key".into(), "  555 ".into());
    fields.insert("phone".into(), "+1555\t".into());
    let channel = validate(ChannelKind::WhatsApp, &fields, " tok ").unwrap();

    store
        .save_at(
            ConfigUpdate {
                channel,
                source: Source::Mcp,
                ngrok_token: " tok ".into(),
            },
            t0(),
        )
        .await
        .unwrap();

    let loaded = store.load();
    assert_eq!(
        loaded.channel_config(ChannelKind::WhatsApp),
        Some(ChannelConfig::WhatsApp(WhatsAppConfig {
            api_key: "555".into(),
            phone: "+1555".into(),
        }))
    );
    assert_eq!(loaded.ngrok_token, "tok");
    assert_eq!(loaded.source, Some(Source::Mcp));
}
