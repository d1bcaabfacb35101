use pdfrag::{
    providers_from_config, ChatProvider, Config, ConfigError, EmbedProvider, HttpError,
    DEFAULT_TOP_K,
};

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    cfg.validate().expect("default config should validate");
    assert_eq!(cfg.chunk_size, 1000);
    assert_eq!(cfg.chunk_overlap, 100);
    assert_eq!(cfg.top_k, DEFAULT_TOP_K);
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    let cfg = Config {
        chunk_size: 100,
        chunk_overlap: 100,
        ..Config::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::OverlapTooLarge { size: 100, overlap: 100 })
    ));

    let zero = Config {
        chunk_size: 0,
        chunk_overlap: 0,
        ..Config::default()
    };
    assert!(matches!(zero.validate(), Err(ConfigError::ZeroChunkSize)));
}

#[test]
fn remote_providers_need_keys() {
    let cfg = Config {
        chat_provider: ChatProvider::Groq,
        ..Config::default()
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::MissingApiKey("GROQ_API_KEY"))));

    let cfg = Config {
        embed_provider: EmbedProvider::OpenAi,
        openai_api_key: "sk-test".to_string(),
        ..Config::default()
    };
    cfg.validate().expect("key present");
}

#[test]
fn providers_parse_case_insensitively() {
    assert_eq!("Ollama".parse::<EmbedProvider>().ok(), Some(EmbedProvider::Ollama));
    assert_eq!("openai".parse::<EmbedProvider>().ok(), Some(EmbedProvider::OpenAi));
    assert_eq!("GROQ".parse::<ChatProvider>().ok(), Some(ChatProvider::Groq));
    assert!(matches!(
        "gemini".parse::<ChatProvider>(),
        Err(ConfigError::UnknownProvider { kind: "chat", .. })
    ));
}

#[test]
fn api_key_that_cannot_be_a_header_is_an_error() {
    let cfg = Config {
        chat_provider: ChatProvider::Groq,
        groq_api_key: "gsk_bad\nkey".to_string(),
        ..Config::default()
    };
    let err = providers_from_config(&cfg)
        .err()
        .expect("newline in key must be rejected");
    assert!(matches!(err, HttpError::InvalidApiKey(_)));
    assert!(!err.is_transient());
}
