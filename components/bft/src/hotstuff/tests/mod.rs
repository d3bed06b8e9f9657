mod commit;
mod new_view;
