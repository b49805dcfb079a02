pub mod detection {
    pub mod domain {
        pub mod detection_result;
        pub mod emotion;
        pub mod expression_classifier;
        pub mod expression_scores;
    }
    pub mod infrastructure;
}

pub mod media {
    pub mod domain {
        pub mod media_source;
    }
    pub mod infrastructure;
}

pub mod presentation {
    pub mod emotion_display;
    pub mod emotion_presentation;
    pub mod emotion_presenter;
}

pub mod rendering {
    pub mod domain {
        pub mod drawing_surface;
    }
    pub mod infrastructure;
    pub mod overlay_renderer;
}

pub mod pipeline {
    pub mod cycle_logger;
    pub mod detection_loop;
    pub mod startup_use_case;
}

pub mod shared {
    pub mod color;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod point;
}
