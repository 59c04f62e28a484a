pub(crate) const ERR_POISONED_LOCK: &str =
    "encountered poisoned lock - a holder panicked while modifying pooled data";
