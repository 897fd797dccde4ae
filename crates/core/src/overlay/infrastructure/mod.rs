pub mod raster_compositor;
