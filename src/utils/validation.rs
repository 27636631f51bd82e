use anyhow::{anyhow, Result};

pub const MAX_POD_NAME_LENGTH: usize = 64;
pub const MAX_PLAYER_NAME_LENGTH: usize = 32;
pub const DELETION_REFERENCE_LENGTH: usize = 8;

fn validate_display_name(kind: &str, name: &str, max: usize) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("{} cannot be empty", kind));
    }

    if name.chars().count() > max {
        return Err(anyhow!("{} cannot be longer than {} characters", kind, max));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("{} cannot contain line breaks", kind));
    }

    Ok(name.to_string())
}

/// Returns the trimmed pod name if it is acceptable.
pub fn validate_pod_name(name: &str) -> Result<String> {
    validate_display_name("Pod name", name, MAX_POD_NAME_LENGTH)
}

/// Returns the trimmed player name if it is acceptable.
pub fn validate_player_name(name: &str) -> Result<String> {
    validate_display_name("Player name", name, MAX_PLAYER_NAME_LENGTH)
}

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    // Private chats are positive user ids
    if chat_id > 2147483647 {
        return Err(anyhow!("Invalid user chat ID range"));
    }

    // Supergroups sit around -100xxxxxxxxxx
    if chat_id < -2000000000000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}

/// Normalizes a game deletion reference to its stored uppercase form.
pub fn validate_deletion_reference(reference: &str) -> Result<String> {
    let reference = reference.trim();

    if reference.is_empty() {
        return Err(anyhow!("Game reference cannot be empty"));
    }

    if reference.len() != DELETION_REFERENCE_LENGTH {
        return Err(anyhow!(
            "Game reference must be exactly {} characters long",
            DELETION_REFERENCE_LENGTH
        ));
    }

    if !reference.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(anyhow!("Game reference can only contain letters and numbers"));
    }

    Ok(reference.to_uppercase())
}

/// Parses an optional 1-based page number; an empty argument means the first page.
pub fn parse_page(arg: &str) -> Result<u32> {
    let arg = arg.trim();

    if arg.is_empty() {
        return Ok(1);
    }

    let page: u32 = arg
        .parse()
        .map_err(|_| anyhow!("Page must be a positive number"))?;

    if page == 0 {
        return Err(anyhow!("Page must be a positive number"));
    }

    if page > 1000 {
        return Err(anyhow!("Page cannot be greater than 1000"));
    }

    Ok(page)
}
