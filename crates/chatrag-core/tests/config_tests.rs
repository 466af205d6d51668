use chatrag_core::config::{expand_path, Config, Settings, MAX_K_RRF, MAX_SEQUENCE_LEN};
use figment::Jail;
use std::path::Path;

#[test]
fn defaults_apply_without_files() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        let settings = Config::load().and_then(|c| c.settings()).map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.k_rrf, 60);
        assert_eq!(settings.maintainer.interval_secs, 600);
        Ok(())
    });
}

#[test]
fn env_file_and_vars_layer_over_base_file() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file(
            "config.toml",
            r#"
            [retrieval]
            k = 4
            m = 20

            [storage]
            uri = "/var/lib/chatrag"
            "#,
        )?;
        jail.create_file("config.test.toml", "[retrieval]\nm = 30\n")?;
        jail.set_env("RUST_ENV", "test");
        jail.set_env("APP_MAINTAINER__INTERVAL_SECS", "30");
        jail.set_env("APP_EMBEDDING__FAKE", "true");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.retrieval.k, 4);
        assert_eq!(settings.retrieval.m, 30);
        assert_eq!(settings.maintainer.interval_secs, 30);
        assert!(settings.embedding.fake);
        assert_eq!(settings.storage.uri, "/var/lib/chatrag");
        assert_eq!(config.get::<usize>("retrieval.k_rrf").map_err(|e| e.to_string())?, 60);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("config.toml", "[lexical]\nb = 1.5\n")?;
        assert!(Config::load().and_then(|c| c.settings()).is_err());
        Ok(())
    });

    let mut settings = Settings::default();
    settings.retrieval.k = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.storage.sparse_table = settings.storage.dense_table.clone();
    assert!(settings.validate().is_err());
}

#[test]
fn rrf_constant_and_sequence_length_are_bounded() {
    let mut settings = Settings::default();
    settings.retrieval.k_rrf = MAX_K_RRF;
    assert!(settings.validate().is_ok());
    settings.retrieval.k_rrf = usize::MAX;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.embedding.max_len = 0;
    assert!(settings.validate().is_err());
    settings.embedding.max_len = MAX_SEQUENCE_LEN + 1;
    assert!(settings.validate().is_err());
    settings.embedding.max_len = MAX_SEQUENCE_LEN;
    assert!(settings.validate().is_ok());

    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.set_env("APP_EMBEDDING__MAX_LEN", "0");
        assert!(Config::load().and_then(|c| c.settings()).is_err());
        Ok(())
    });
}

#[test]
fn paths_expand_env() {
    Jail::expect_with(|jail| {
        jail.set_env("CHATRAG_TEST_ROOT", "/srv/rag");
        assert_eq!(expand_path("${CHATRAG_TEST_ROOT}/db"), Path::new("/srv/rag/db"));
        Ok(())
    });
}
