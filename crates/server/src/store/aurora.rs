//! Entity store backed by aurora-db.
//!
//! List-valued fields (participants, members, message references, reactions,
//! read-by) are JSON-serialized into string fields; the unique `pair_key`
//! field carries the conversation uniqueness constraint.

use async_trait::async_trait;
use aurora_db::{Aurora, Document, FieldType};
use chrono::{DateTime, Utc};

use huddle_shared::{ChatMessage, Container, Conversation, MessagePayload, Reaction, UserId};

use crate::conversations::PairKey;
use crate::store::{MessagePatch, Store, StoreError};

pub struct AuroraStore {
    db: Aurora,
}

impl AuroraStore {
    /// Open the database and make sure every collection exists.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let db = Aurora::open(db_path).map_err(backend)?;

        let _ = db.new_collection(
            "conversations",
            vec![
                ("id", FieldType::String, true),
                ("pair_key", FieldType::String, true),
                ("participants", FieldType::String, false), // JSON serialized
                ("message_ids", FieldType::String, false),  // JSON serialized
                ("created_at", FieldType::String, false),
                ("updated_at", FieldType::String, false),
            ],
        );

        let _ = db.new_collection(
            "channels",
            vec![
                ("id", FieldType::String, true),
                ("name", FieldType::String, false),
                ("admin", FieldType::String, false),
                ("members", FieldType::String, false),     // JSON serialized
                ("message_ids", FieldType::String, false), // JSON serialized
                ("created_at", FieldType::String, false),
                ("updated_at", FieldType::String, false),
            ],
        );

        let _ = db.new_collection(
            "messages",
            vec![
                ("id", FieldType::String, true),
                ("sender", FieldType::String, false),
                ("container_kind", FieldType::String, false),
                ("container_id", FieldType::String, false),
                ("message_type", FieldType::String, false),
                ("content", FieldType::String, false),
                ("file_url", FieldType::String, false),
                ("timestamp", FieldType::String, false),
                ("edited", FieldType::String, false),
                ("forwarded", FieldType::String, false),
                ("reactions", FieldType::String, false), // JSON serialized
                ("read_by", FieldType::String, false),   // JSON serialized
            ],
        );

        Ok(Self { db })
    }

    async fn message_doc(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self
            .db
            .query("messages")
            .filter(|f| f.eq("id", id.to_string()))
            .collect()
            .await
            .map_err(backend)?;
        Ok(docs.into_iter().next())
    }

    async fn conversation_doc(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self
            .db
            .query("conversations")
            .filter(|f| f.eq("id", id.to_string()))
            .collect()
            .await
            .map_err(backend)?;
        Ok(docs.into_iter().next())
    }

    async fn channel_doc(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self
            .db
            .query("channels")
            .filter(|f| f.eq("id", id.to_string()))
            .collect()
            .await
            .map_err(backend)?;
        Ok(docs.into_iter().next())
    }

    async fn conversation_by_key(
        &self,
        key: &PairKey,
    ) -> Result<Option<Conversation>, StoreError> {
        let docs = self
            .db
            .query("conversations")
            .filter(|f| f.eq("pair_key", key.storage_key()))
            .collect()
            .await
            .map_err(backend)?;
        Ok(docs.into_iter().next().map(|doc| conversation_from_doc(&doc)))
    }

    async fn container_messages(
        &self,
        kind: &str,
        container_id: &str,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let mut docs = self
            .db
            .query("messages")
            .filter(|f| {
                f.eq("container_kind", kind.to_string())
                    & f.eq("container_id", container_id.to_string())
            })
            .collect()
            .await
            .map_err(backend)?;

        docs.sort_by(|a, b| {
            let ts_cmp = doc_str(a, "timestamp").cmp(&doc_str(b, "timestamp"));
            if ts_cmp == std::cmp::Ordering::Equal {
                doc_str(a, "id").cmp(&doc_str(b, "id"))
            } else {
                ts_cmp
            }
        });
        Ok(docs.iter().map(message_from_doc).collect())
    }
}

#[async_trait]
impl Store for AuroraStore {
    async fn create_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let (message_type, content, file_url) = match &message.payload {
            MessagePayload::Text { content } => ("text", content.clone(), String::new()),
            MessagePayload::File { file_url } => ("file", String::new(), file_url.clone()),
        };
        let (container_kind, container_id) = container_fields(&message.container);

        self.db
            .insert_into(
                "messages",
                vec![
                    ("id", message.id.clone().into()),
                    ("sender", message.sender.clone().into()),
                    ("container_kind", container_kind.into()),
                    ("container_id", container_id.into()),
                    ("message_type", message_type.into()),
                    ("content", content.into()),
                    ("file_url", file_url.into()),
                    ("timestamp", message.timestamp.to_rfc3339().into()),
                    ("edited", bool_field(message.edited).into()),
                    ("forwarded", bool_field(message.forwarded).into()),
                    ("reactions", to_json(&message.reactions).into()),
                    ("read_by", to_json(&message.read_by).into()),
                ],
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self.message_doc(id).await?.map(|doc| message_from_doc(&doc)))
    }

    async fn update_message(
        &self,
        id: &str,
        patch: MessagePatch,
    ) -> Result<Option<ChatMessage>, StoreError> {
        let Some(doc) = self.message_doc(id).await? else {
            return Ok(None);
        };

        // Merge the patch over the stored fields and write the full record
        // back; the backend serializes writes per document.
        let content = patch.content.unwrap_or_else(|| doc_str(&doc, "content"));
        let edited = patch
            .edited
            .map(|v| bool_field(v).to_string())
            .unwrap_or_else(|| doc_str(&doc, "edited"));
        let timestamp = patch
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| doc_str(&doc, "timestamp"));
        let reactions = patch
            .reactions
            .map(|r| to_json(&r))
            .unwrap_or_else(|| doc_str(&doc, "reactions"));
        let read_by = patch
            .read_by
            .map(|r| to_json(&r))
            .unwrap_or_else(|| doc_str(&doc, "read_by"));

        self.db
            .update_document(
                "messages",
                &doc.id,
                vec![
                    ("content", content.into()),
                    ("edited", edited.into()),
                    ("timestamp", timestamp.into()),
                    ("reactions", reactions.into()),
                    ("read_by", read_by.into()),
                ],
            )
            .await
            .map_err(backend)?;
        Ok(self.message_doc(id).await?.map(|doc| message_from_doc(&doc)))
    }

    async fn delete_message(&self, id: &str) -> Result<(), StoreError> {
        if let Some(doc) = self.message_doc(id).await? {
            self.db
                .delete(&format!("messages:{}", doc.id))
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn find_or_create_conversation(
        &self,
        key: &PairKey,
    ) -> Result<Conversation, StoreError> {
        if let Some(existing) = self.conversation_by_key(key).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            participants: key.users(),
            message_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .db
            .insert_into(
                "conversations",
                vec![
                    ("id", conversation.id.clone().into()),
                    ("pair_key", key.storage_key().into()),
                    ("participants", to_json(&conversation.participants).into()),
                    ("message_ids", "[]".into()),
                    ("created_at", now.to_rfc3339().into()),
                    ("updated_at", now.to_rfc3339().into()),
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(conversation),
            // A racing creator hit the unique pair_key first; theirs wins.
            Err(insert_err) => match self.conversation_by_key(key).await? {
                Some(existing) => Ok(existing),
                None => Err(backend(insert_err)),
            },
        }
    }

    async fn find_conversation(&self, key: &PairKey) -> Result<Option<Conversation>, StoreError> {
        self.conversation_by_key(key).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversation_doc(id)
            .await?
            .map(|doc| conversation_from_doc(&doc)))
    }

    async fn append_to_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let (collection, doc) = match container {
            Container::Conversation { conversation_id } => (
                "conversations",
                self.conversation_doc(conversation_id).await?,
            ),
            Container::Channel { channel_id } => ("channels", self.channel_doc(channel_id).await?),
        };
        let doc = doc.ok_or_else(|| StoreError::Backend("unknown container".to_string()))?;

        let mut message_ids: Vec<String> = doc_json(&doc, "message_ids");
        message_ids.push(message_id.to_string());

        self.db
            .update_document(
                collection,
                &doc.id,
                vec![
                    ("message_ids", to_json(&message_ids).into()),
                    ("updated_at", Utc::now().to_rfc3339().into()),
                ],
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn remove_from_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let (collection, doc) = match container {
            Container::Conversation { conversation_id } => (
                "conversations",
                self.conversation_doc(conversation_id).await?,
            ),
            Container::Channel { channel_id } => ("channels", self.channel_doc(channel_id).await?),
        };
        let Some(doc) = doc else {
            return Ok(());
        };

        let mut message_ids: Vec<String> = doc_json(&doc, "message_ids");
        message_ids.retain(|id| id != message_id);

        self.db
            .update_document(
                collection,
                &doc.id,
                vec![
                    ("message_ids", to_json(&message_ids).into()),
                    ("updated_at", Utc::now().to_rfc3339().into()),
                ],
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn channel_members(
        &self,
        channel_id: &str,
    ) -> Result<Option<Vec<UserId>>, StoreError> {
        Ok(self
            .channel_doc(channel_id)
            .await?
            .map(|doc| doc_json(&doc, "members")))
    }

    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        self.container_messages("conversation", conversation_id).await
    }

    async fn channel_messages(&self, channel_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        self.container_messages("channel", channel_id).await
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn doc_str(doc: &Document, field: &str) -> String {
    doc.data
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn doc_bool(doc: &Document, field: &str) -> bool {
    doc.data.get(field).and_then(|v| v.as_str()) == Some("true")
}

fn doc_time(doc: &Document, field: &str) -> DateTime<Utc> {
    doc.data
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn doc_json<T: serde::de::DeserializeOwned + Default>(doc: &Document, field: &str) -> T {
    doc.data
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn container_fields(container: &Container) -> (&'static str, String) {
    match container {
        Container::Conversation { conversation_id } => ("conversation", conversation_id.clone()),
        Container::Channel { channel_id } => ("channel", channel_id.clone()),
    }
}

fn message_from_doc(doc: &Document) -> ChatMessage {
    let container = match doc_str(doc, "container_kind").as_str() {
        "channel" => Container::Channel {
            channel_id: doc_str(doc, "container_id"),
        },
        _ => Container::Conversation {
            conversation_id: doc_str(doc, "container_id"),
        },
    };
    let payload = match doc_str(doc, "message_type").as_str() {
        "file" => MessagePayload::File {
            file_url: doc_str(doc, "file_url"),
        },
        _ => MessagePayload::Text {
            content: doc_str(doc, "content"),
        },
    };
    let reactions: Vec<Reaction> = doc_json(doc, "reactions");
    let read_by: Vec<UserId> = doc_json(doc, "read_by");

    ChatMessage {
        id: doc_str(doc, "id"),
        sender: doc_str(doc, "sender"),
        container,
        payload,
        timestamp: doc_time(doc, "timestamp"),
        edited: doc_bool(doc, "edited"),
        forwarded: doc_bool(doc, "forwarded"),
        reactions,
        read_by,
    }
}

fn conversation_from_doc(doc: &Document) -> Conversation {
    let participants: Vec<UserId> = doc_json(doc, "participants");
    let mut pair = participants.into_iter();
    let participants = [
        pair.next().unwrap_or_default(),
        pair.next().unwrap_or_default(),
    ];

    Conversation {
        id: doc_str(doc, "id"),
        participants,
        message_ids: doc_json(doc, "message_ids"),
        created_at: doc_time(doc, "created_at"),
        updated_at: doc_time(doc, "updated_at"),
    }
}
