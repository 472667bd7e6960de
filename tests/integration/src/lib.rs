//! End-to-end tests for the provisioning commands live under `tests/`.
