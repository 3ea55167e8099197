
/// Contains the AlignmentRecord type and SAM flag helpers
pub mod alignment;
/// Contains the ContactGraph type as well as the Partition label
pub mod contact_graph;
/// Bijective mapping from names to dense integer ids
pub mod id_registry;
