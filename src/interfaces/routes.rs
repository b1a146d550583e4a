use actix_web::web;

use crate::handlers::{home::home, images, system::health_check};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(health_check);

    // Literal segments before `{id}` so /images/{id}/download wins.
    cfg.service(images::upload_image);
    cfg.service(images::list_images);
    cfg.service(images::download_image);
    cfg.service(images::permanent_delete_image);
    cfg.service(images::get_image);
    cfg.service(images::delete_image);

    cfg.service(images::list_user_images);
    cfg.service(images::list_tag_images);
}
