pub mod scope_tree;
