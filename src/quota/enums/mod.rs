pub mod quota_decision;
