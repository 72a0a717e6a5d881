//! Deterministic demo data for trying the inbox out

use chrono::{DateTime, Duration, Utc};
use inbox_store::{Conversation, Message, MessageBody};

const NAMES: &[&str] = &[
    "Alice Martin",
    "Bob Keller",
    "Carol Nguyen",
    "Dmitri Volkov",
    "Esme Laurent",
    "Farid Haddad",
    "Grace Okafor",
    "Hiro Tanaka",
];

const LINES: &[&str] = &[
    "Are we still on for tomorrow?",
    "I pushed the draft, can you take a look?",
    "Running ten minutes late, sorry",
    "Sounds good to me",
    "Did you get a chance to review the contract?",
    "Lunch on Friday?",
    "The client wants the numbers by Monday",
    "Thanks, that helps a lot",
    "Can you call me when you're free?",
    "Here's the summary from the meeting",
    "Let's move the sync to 3pm",
    "Great news on the launch!",
];

/// A conversation with its messages, oldest first
pub struct SeedConversation {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Build `conversations` conversations of `per_conversation` messages each.
///
/// Later conversations end with a growing run of unread incoming
/// messages; the first one is fully read.
pub fn generate(conversations: usize, per_conversation: usize, now: DateTime<Utc>) -> Vec<SeedConversation> {
    (0..conversations)
        .map(|c| {
            let id = format!("c{}", c + 1);
            let name = match NAMES.get(c) {
                Some(name) => name.to_string(),
                None => format!("Contact {}", c + 1),
            };
            let start = now - Duration::hours(c as i64 + 1) - Duration::minutes(per_conversation as i64);
            let unread_tail = c.min(per_conversation);

            let messages: Vec<Message> = (0..per_conversation)
                .map(|m| {
                    let timestamp = start + Duration::minutes(m as i64);
                    let body = body_for(c, m);
                    let message_id = format!("{}-m{:03}", id, m + 1);
                    if m % 3 == 1 && m + unread_tail < per_conversation {
                        Message::outgoing(message_id, body, timestamp)
                    } else {
                        Message::incoming(message_id, body, timestamp)
                            .with_read(m + unread_tail < per_conversation)
                    }
                })
                .collect();

            let mut conversation = Conversation::new(id, name, start);
            conversation.is_online = c % 2 == 0;
            SeedConversation {
                conversation,
                messages,
            }
        })
        .collect()
}

fn body_for(conversation: usize, index: usize) -> MessageBody {
    let n = conversation * 31 + index;
    match index {
        i if i % 17 == 16 => MessageBody::Document {
            file_name: format!("report-{}.pdf", n % 9 + 1),
            file_size: format!("{} KB", 120 + n % 400),
            url: format!("https://files.example.com/{}.pdf", n),
        },
        i if i % 11 == 10 => MessageBody::Voice {
            url: format!("https://media.example.com/{}.ogg", n),
            duration_secs: (n % 90 + 5) as u32,
        },
        i if i % 7 == 6 => MessageBody::Image {
            url: format!("https://media.example.com/{}.jpg", n),
            caption: (n % 2 == 0).then(|| "Look at this".to_string()),
        },
        _ => MessageBody::text(LINES[n % LINES.len()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_shape_and_unread_tail() {
        let seed = generate(4, 20, now());
        assert_eq!(seed.len(), 4);
        for (c, entry) in seed.iter().enumerate() {
            assert_eq!(entry.messages.len(), 20);
            let unread = entry.messages.iter().filter(|m| m.is_unread()).count();
            assert_eq!(unread, c);
            assert!(entry.messages.iter().filter(|m| m.is_unread()).all(|m| !m.is_outgoing));
        }
        assert_eq!(seed[0].conversation.name, "Alice Martin");
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let seed = generate(3, 40, now());
        let mut ids: Vec<_> = seed
            .iter()
            .flat_map(|e| e.messages.iter().map(|m| m.id.clone()))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);

        for entry in &seed {
            assert!(entry.messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }
    }

    #[test]
    fn test_mixed_payloads() {
        let seed = generate(1, 40, now());
        let bodies = &seed[0].messages;
        assert!(bodies.iter().any(|m| matches!(m.body, MessageBody::Image { .. })));
        assert!(bodies.iter().any(|m| matches!(m.body, MessageBody::Voice { .. })));
        assert!(bodies.iter().any(|m| matches!(m.body, MessageBody::Document { .. })));
    }

    #[test]
    fn test_names_beyond_the_list() {
        let seed = generate(10, 1, now());
        assert_eq!(seed[9].conversation.name, "Contact 10");
    }
}
