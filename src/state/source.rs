/// Collaborator contracts the board core reads through.
///
/// The SQLite catalog implements all of them; the layout and board code
/// only ever see these traits.
use crate::error::Result;
use crate::state::data::{ImageId, ImageRecord, ReactionDraft, ReactionRecord, UserId};

pub trait ImageSource {
    /// Every live image, newest upload first
    fn list_images(&self) -> Result<Vec<ImageRecord>>;
}

pub trait ReactionSource {
    fn list_reactions_for_image(&self, image_id: ImageId) -> Result<Vec<ReactionRecord>>;

    /// Newest first
    fn list_reactions_for_user(&self, user_id: UserId) -> Result<Vec<ReactionRecord>>;

    fn reaction_for(&self, user_id: UserId, image_id: ImageId) -> Result<Option<ReactionRecord>>;

    /// Insert, or overwrite the existing reaction of `user_id` on `image_id`
    fn add_or_update_reaction(
        &mut self,
        user_id: UserId,
        image_id: ImageId,
        draft: ReactionDraft,
    ) -> Result<ReactionRecord>;
}
