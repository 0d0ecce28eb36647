//! Key paths of the per-user chat namespace.

pub fn chats(uid: &str) -> String {
    format!("users/{}/chats", uid)
}

pub fn chat(uid: &str, chat_id: &str) -> String {
    format!("users/{}/chats/{}", uid, chat_id)
}

pub fn chat_title(uid: &str, chat_id: &str) -> String {
    format!("users/{}/chats/{}/title", uid, chat_id)
}

pub fn messages(uid: &str, chat_id: &str) -> String {
    format!("users/{}/chats/{}/messages", uid, chat_id)
}

pub fn message(uid: &str, chat_id: &str, push_id: &str) -> String {
    format!("users/{}/chats/{}/messages/{}", uid, chat_id, push_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(chats("u1"), "users/u1/chats");
        assert_eq!(chat_title("u1", "c1"), "users/u1/chats/c1/title");
        assert_eq!(
            message("u1", "c1", "-Nabc"),
            "users/u1/chats/c1/messages/-Nabc"
        );
    }
}
