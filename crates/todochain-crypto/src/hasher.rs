use chrono::{DateTime, Utc};
use todochain_types::todo::FIELD_SEPARATOR;
use todochain_types::{time, Digest, OwnerId, Priority, Todo};

/// The semantic fields of a todo that take part in its digest.
///
/// Anything not listed here (identifiers, deletion state, timestamps other
/// than creation, the sync envelope) can change without changing the hash.
#[derive(Clone, Copy, Debug)]
pub struct HashFields<'a> {
    pub owner: &'a OwnerId,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<&'a DateTime<Utc>>,
    pub created_at: &'a DateTime<Utc>,
}

impl<'a> From<&'a Todo> for HashFields<'a> {
    fn from(todo: &'a Todo) -> Self {
        Self {
            owner: &todo.owner,
            title: &todo.title,
            description: todo.description.as_deref(),
            completed: todo.completed,
            priority: todo.priority,
            due_date: todo.due_date.as_ref(),
            created_at: &todo.created_at,
        }
    }
}

impl HashFields<'_> {
    /// The exact byte sequence fed to the digest, without the domain tag.
    ///
    /// Field order is fixed and part of the on-ledger format.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let due_date = self.due_date.map(time::canonical).unwrap_or_default();
        let created_at = time::canonical(self.created_at);
        let completed = if self.completed { "true" } else { "false" };
        let fields: [&str; 7] = [
            self.owner.as_str(),
            self.title,
            self.description.unwrap_or(""),
            completed,
            self.priority.token(),
            &due_date,
            &created_at,
        ];
        let mut separator = [0u8; 4];
        let separator = FIELD_SEPARATOR.encode_utf8(&mut separator).as_bytes();
        let mut out = Vec::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(separator);
            }
            out.extend_from_slice(field.as_bytes());
        }
        out
    }
}

/// Domain-separated BLAKE3 hasher for todo content.
///
/// The domain tag is versioned so the field layout can evolve without old
/// and new digests ever colliding.
pub struct TodoHasher {
    domain: &'static str,
}

impl TodoHasher {
    /// Current todo layout.
    pub const V1: Self = Self {
        domain: "todochain-todo-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Digest of the given fields.
    pub fn hash(&self, fields: &HashFields<'_>) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&fields.canonical_bytes());
        Digest::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Digest of a todo's current semantic fields.
    pub fn hash_todo(&self, todo: &Todo) -> Digest {
        self.hash(&HashFields::from(todo))
    }

    /// Recompute and compare against a hex digest, case-insensitively.
    /// A malformed `expected` never verifies.
    pub fn verify(&self, todo: &Todo, expected: &str) -> bool {
        Digest::from_hex(expected)
            .map(|expected| self.hash_todo(todo) == expected)
            .unwrap_or(false)
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Digest of a todo with the current layout.
pub fn compute_hash(todo: &Todo) -> Digest {
    TodoHasher::V1.hash_todo(todo)
}

/// Check a todo against an expected hex digest with the current layout.
pub fn verify_hash(todo: &Todo, expected: &str) -> bool {
    TodoHasher::V1.verify(todo, expected)
}
