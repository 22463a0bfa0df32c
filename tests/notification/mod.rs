mod mark_read;
