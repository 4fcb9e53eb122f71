use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::mem::size_of;
use std::str::{self, FromStr};

pub const MESSAGE_ID_SIZE: usize = 32;

/// Content address of a DAG message. Compared by byte equality and used as a map key.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Default, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId([u8; MESSAGE_ID_SIZE]);

impl MessageId {
    /// The all-zeros id. Parents of the genesis message point here.
    pub const NULL: MessageId = MessageId([0u8; MESSAGE_ID_SIZE]);

    pub const fn from_bytes(bytes: [u8; MESSAGE_ID_SIZE]) -> Self {
        MessageId(bytes)
    }

    pub const fn as_bytes(self) -> [u8; MESSAGE_ID_SIZE] {
        self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(<[u8; MESSAGE_ID_SIZE]>::try_from(bytes).expect("Slice must have the length of MessageId"))
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// To be used for test purposes only
    pub fn new_unique() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let c = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::from_u64(c)
    }

    pub fn from_u64(word: u64) -> Self {
        let mut bytes = [0u8; MESSAGE_ID_SIZE];
        bytes[0..size_of::<u64>()].copy_from_slice(&word.to_le_bytes());
        MessageId(bytes)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; MESSAGE_ID_SIZE * 2];
        hex::encode_to_slice(self.0, &mut hex).expect("The output is exactly twice the size of the input");
        f.write_str(str::from_utf8(&hex).expect("hex is always valid UTF-8"))
    }
}

impl FromStr for MessageId {
    type Err = hex::FromHexError;

    fn from_str(id_str: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; MESSAGE_ID_SIZE];
        hex::decode_to_slice(id_str, &mut bytes)?;
        Ok(MessageId(bytes))
    }
}

impl From<u64> for MessageId {
    fn from(word: u64) -> Self {
        Self::from_u64(word)
    }
}

impl AsRef<[u8]> for MessageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::MessageId;
    use std::str::FromStr;

    #[test]
    fn test_message_id_basics() {
        let id_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3af";
        let id = MessageId::from_str(id_str).unwrap();
        assert_eq!(id_str, id.to_string());
        let id2 = MessageId::from_str(id_str).unwrap();
        assert_eq!(id, id2);

        let id3 = MessageId::from_str("8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3ab").unwrap();
        assert_ne!(id2, id3);

        let odd_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3a";
        let short_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3";

        assert_eq!(MessageId::from_str(odd_str), Err(hex::FromHexError::OddLength));
        assert_eq!(MessageId::from_str(short_str), Err(hex::FromHexError::InvalidStringLength));
    }

    #[test]
    fn test_null_id() {
        assert!(MessageId::NULL.is_null());
        assert!(!MessageId::from(7u64).is_null());
        assert_eq!(MessageId::default(), MessageId::NULL);
    }
}
