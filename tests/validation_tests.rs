use edh_pod_bot::utils::validation::*;

#[test]
fn test_valid_pod_names() {
    let valid_names = vec![
        "Friday Night Commander".to_string(),
        "Pod".to_string(),
        "🃏 Kitchen Table".to_string(),
        "A".repeat(MAX_POD_NAME_LENGTH),
    ];

    for name in valid_names {
        assert!(validate_pod_name(&name).is_ok(), "Should accept pod name: {}", name);
    }
}

#[test]
fn test_invalid_pod_names() {
    let invalid_names = vec![
        "".to_string(),
        "   ".to_string(),
        "A".repeat(MAX_POD_NAME_LENGTH + 1),
        "Two\nLines".to_string(),
    ];

    for name in invalid_names {
        assert!(validate_pod_name(&name).is_err(), "Should reject pod name: {:?}", name);
    }
}

#[test]
fn test_pod_name_is_trimmed() {
    assert_eq!(validate_pod_name("  Friday Pod  ").unwrap(), "Friday Pod");
}

#[test]
fn test_player_names() {
    assert_eq!(validate_player_name(" Alice ").unwrap(), "Alice");
    assert!(validate_player_name(&"B".repeat(MAX_PLAYER_NAME_LENGTH)).is_ok());
    assert!(validate_player_name(&"B".repeat(MAX_PLAYER_NAME_LENGTH + 1)).is_err());
    assert!(validate_player_name("").is_err());
}

#[test]
fn test_valid_telegram_chat_ids() {
    for chat_id in [-1001234567890_i64, -987654321_i64, 123456789_i64] {
        assert!(validate_telegram_chat_id(chat_id).is_ok(), "Should accept chat_id: {}", chat_id);
    }
}

#[test]
fn test_invalid_telegram_chat_ids() {
    for chat_id in [0_i64, 3_000_000_000_i64, -3_000_000_000_000_i64] {
        assert!(validate_telegram_chat_id(chat_id).is_err(), "Should reject chat_id: {}", chat_id);
    }
}

#[test]
fn test_deletion_references() {
    assert_eq!(validate_deletion_reference("ab12cd34").unwrap(), "AB12CD34");
    assert!(validate_deletion_reference("").is_err());
    assert!(validate_deletion_reference("AB12").is_err());
    assert!(validate_deletion_reference("AB12CD34EF").is_err());
    assert!(validate_deletion_reference("AB12-D34").is_err());
}

#[test]
fn test_parse_page() {
    assert_eq!(parse_page("").unwrap(), 1);
    assert_eq!(parse_page(" 3 ").unwrap(), 3);
    assert!(parse_page("0").is_err());
    assert!(parse_page("-2").is_err());
    assert!(parse_page("two").is_err());
    assert!(parse_page("1001").is_err());
}
