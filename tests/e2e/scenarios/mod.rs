mod dangling_media;
mod fts_lifecycle;
mod idempotent_edit_revert;
mod minimal_add_commit;
mod reminder_evaluation;
mod reset_never_committed;
