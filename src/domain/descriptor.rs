use serde::{Deserialize, Serialize};
use std::fmt;

// Difficulty axis of a match request. `Any` is a wildcard that is only valid
// as a request input; a resolved descriptor keeps it only when both sides
// asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Any,
    Easy,
    Medium,
    Hard,
}

// Topic axis of a match request. Values mirror the question catalog and form
// a closed set shared by every front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Any,
    Array,
    Binary,
    BinarySearch,
    BinarySearchTree,
    BinaryTree,
    DynamicProgramming,
    Graph,
    Greedy,
    HashTable,
    Heap,
    LinkedList,
    Math,
    Matrix,
    Queue,
    Recursion,
    Sorting,
    Stack,
    String,
    Trie,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Any,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Any => "any",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == value)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Difficulty::Any)
    }
}

impl Topic {
    pub const ALL: [Topic; 20] = [
        Topic::Any,
        Topic::Array,
        Topic::Binary,
        Topic::BinarySearch,
        Topic::BinarySearchTree,
        Topic::BinaryTree,
        Topic::DynamicProgramming,
        Topic::Graph,
        Topic::Greedy,
        Topic::HashTable,
        Topic::Heap,
        Topic::LinkedList,
        Topic::Math,
        Topic::Matrix,
        Topic::Queue,
        Topic::Recursion,
        Topic::Sorting,
        Topic::Stack,
        Topic::String,
        Topic::Trie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Any => "any",
            Topic::Array => "array",
            Topic::Binary => "binary",
            Topic::BinarySearch => "binary_search",
            Topic::BinarySearchTree => "binary_search_tree",
            Topic::BinaryTree => "binary_tree",
            Topic::DynamicProgramming => "dynamic_programming",
            Topic::Graph => "graph",
            Topic::Greedy => "greedy",
            Topic::HashTable => "hash_table",
            Topic::Heap => "heap",
            Topic::LinkedList => "linked_list",
            Topic::Math => "math",
            Topic::Matrix => "matrix",
            Topic::Queue => "queue",
            Topic::Recursion => "recursion",
            Topic::Sorting => "sorting",
            Topic::Stack => "stack",
            Topic::String => "string",
            Topic::Trie => "trie",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == value)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Topic::Any)
    }
}

// A (difficulty, topic) pair describing what a waiting user wants to practice.
// Serialized on the wire as the partition key "{difficulty}-{topic}".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchDescriptor {
    pub difficulty: Difficulty,
    pub topic: Topic,
}

impl MatchDescriptor {
    pub fn new(difficulty: Difficulty, topic: Topic) -> Self {
        Self { difficulty, topic }
    }

    // Partition key on the message bus, e.g. "easy-math" or "any-hash_table".
    pub fn partition_key(&self) -> String {
        format!("{}-{}", self.difficulty.as_str(), self.topic.as_str())
    }

    // Parse a partition key back into a descriptor. Difficulty values never
    // contain '-', so splitting on the first dash is unambiguous even for
    // topics like "binary_search".
    pub fn parse_partition_key(key: &str) -> Option<Self> {
        let (difficulty, topic) = key.split_once('-')?;
        Some(Self {
            difficulty: Difficulty::parse(difficulty)?,
            topic: Topic::parse(topic)?,
        })
    }

    // Every request partition an engine instance subscribes to.
    pub fn all_partition_keys() -> impl Iterator<Item = String> {
        Difficulty::ALL.iter().flat_map(|difficulty| {
            Topic::ALL
                .iter()
                .map(|topic| MatchDescriptor::new(*difficulty, *topic).partition_key())
        })
    }

    // Whether two descriptors can be paired. Exact equality always matches;
    // a wildcard difficulty on either side defers to topic agreement, and a
    // wildcard topic (with both difficulties concrete) defers to difficulty
    // agreement.
    pub fn is_compatible_with(&self, other: &MatchDescriptor) -> bool {
        if self == other {
            return true;
        }
        if self.difficulty.is_any() || other.difficulty.is_any() {
            return self.topic == other.topic || self.topic.is_any() || other.topic.is_any();
        }
        if self.topic.is_any() || other.topic.is_any() {
            return self.difficulty == other.difficulty;
        }
        false
    }

    // Resolve the most specific descriptor once compatibility is established.
    // Each axis keeps `self`'s value unless it is the wildcard and `other`'s
    // is concrete; callers must preserve operand order.
    pub fn resolve_with(&self, other: &MatchDescriptor) -> MatchDescriptor {
        let difficulty = if self.difficulty.is_any() && !other.difficulty.is_any() {
            other.difficulty
        } else {
            self.difficulty
        };
        let topic = if self.topic.is_any() && !other.topic.is_any() {
            other.topic
        } else {
            self.topic
        };
        MatchDescriptor { difficulty, topic }
    }
}

impl fmt::Display for MatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.difficulty.as_str(), self.topic.as_str())
    }
}
